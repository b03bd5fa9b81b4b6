//! Attribute matching for struct construction and `create`.
//!
//! Explicitly named arguments bind first; each remaining positional argument
//! binds implicitly — by name when the argument is itself a plain variable
//! read whose name matches an unmatched attribute, otherwise by unique
//! assignable type. Ambiguity is an error, not a ranking. This heuristic is
//! part of the language's public contract and is preserved exactly.

use std::rc::Rc;

use quill_core::{Attribute, CError, CResult, EvalExpr, RName, RType, Span};
use quill_parser::ast;

use crate::vexpr::CValue;

/// A compiled construction argument.
pub struct CompiledArg {
    /// Explicit `name = expr` binding.
    pub name: Option<ast::Name>,
    /// The argument's own name when it is a plain variable read; used for
    /// implicit by-name matching.
    pub implicit_name: Option<RName>,
    pub value: CValue,
}

/// Match construction arguments against an attribute list. Returns one slot
/// per attribute: `Some` for a bound expression, `None` where the
/// attribute's default applies.
pub fn match_attrs(
    pos: Span,
    what: &str,
    attrs: &[Rc<Attribute>],
    args: Vec<CompiledArg>,
) -> CResult<Vec<Option<EvalExpr>>> {
    let mut slots: Vec<Option<EvalExpr>> = (0..attrs.len()).map(|_| None).collect();
    let mut matched = vec![false; attrs.len()];
    let mut positional = Vec::new();

    // explicit bindings first
    for arg in args {
        let Some(name) = &arg.name else {
            positional.push(arg);
            continue;
        };
        let Some(idx) = attrs.iter().position(|a| a.name == name.str) else {
            return Err(CError::new(
                name.pos,
                format!("attr_unknown:{}", name.str),
                format!("Unknown attribute of '{what}': '{}'", name.str),
            ));
        };
        if matched[idx] {
            return Err(CError::new(
                name.pos,
                format!("attr_dup:{}", name.str),
                format!("Attribute '{}' bound twice", name.str),
            ));
        }
        matched[idx] = true;
        slots[idx] = Some(bind_value(&attrs[idx], arg.value)?);
    }

    // implicit bindings: by name, else by unique assignable type
    for (arg_idx, arg) in positional.into_iter().enumerate() {
        let by_name = arg
            .implicit_name
            .as_ref()
            .and_then(|n| (0..attrs.len()).find(|&i| !matched[i] && attrs[i].name == *n));

        let idx = match by_name {
            Some(i) => i,
            None => {
                let candidates: Vec<usize> = (0..attrs.len())
                    .filter(|&i| !matched[i] && accepts(&attrs[i].ty, &arg.value.ty))
                    .collect();
                match candidates.len() {
                    0 => {
                        return Err(CError::new(
                            arg.value.pos,
                            format!("attr_nomatch:{arg_idx}:{}", arg.value.ty.name()),
                            format!(
                                "No attribute of '{what}' matches argument {arg_idx} of type '{}'",
                                arg.value.ty
                            ),
                        ));
                    }
                    1 => candidates[0],
                    _ => {
                        let names = candidates
                            .iter()
                            .map(|&i| attrs[i].name.as_str())
                            .collect::<Vec<_>>()
                            .join(",");
                        return Err(CError::new(
                            arg.value.pos,
                            format!("attr_ambig:{arg_idx}:{names}"),
                            format!(
                                "Argument {arg_idx} of type '{}' matches multiple attributes of '{what}': {names}",
                                arg.value.ty
                            ),
                        ));
                    }
                }
            }
        };

        matched[idx] = true;
        slots[idx] = Some(bind_value(&attrs[idx], arg.value)?);
    }

    // everything unmatched must carry a default
    let missing: Vec<&str> = attrs
        .iter()
        .enumerate()
        .filter(|(i, a)| !matched[*i] && !a.has_default)
        .map(|(_, a)| a.name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(CError::new(
            pos,
            format!("attr_missing:{}", missing.join(",")),
            format!("Attributes of '{what}' not set: {}", missing.join(", ")),
        ));
    }

    Ok(slots)
}

fn accepts(attr_ty: &RType, value_ty: &RType) -> bool {
    attr_ty.is_assignable_from(value_ty)
        || (*attr_ty == RType::Decimal && *value_ty == RType::Integer)
}

fn bind_value(attr: &Rc<Attribute>, value: CValue) -> CResult<EvalExpr> {
    if !accepts(&attr.ty, &value.ty) {
        return Err(CError::new(
            value.pos,
            format!("attr_bad_type:{}:{}:{}", attr.name, attr.ty.name(), value.ty.name()),
            format!(
                "Attribute '{}' expects '{}', got '{}'",
                attr.name, attr.ty, value.ty
            ),
        ));
    }
    let value = if *attr.ty.unwrap_nullable() == RType::Decimal && value.ty == RType::Integer {
        value.promote_integer_to_decimal()
    } else {
        value
    };
    value.to_eval_expr()
}
