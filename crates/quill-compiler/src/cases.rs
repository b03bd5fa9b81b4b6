//! The overload-case engine.
//!
//! A system function is an ordered list of cases; resolution walks the list
//! and the first case whose argument matchers all accept the call's argument
//! types wins. There is deliberately no most-specific ranking — registration
//! order is part of the library's public contract. A successful match
//! carries the per-argument conversions the caller must apply, so no
//! separate re-check happens later.

use quill_core::{EvalSysFn, RType, SqlSysFn};
use quill_registry::Deprecation;

/// Accepts or rejects one argument type.
#[derive(Debug, Clone)]
pub enum ArgTypeMatcher {
    /// Accepts anything; used by debug/reflection-like primitives.
    Any,
    /// Exact or assignable type match, with the integer-to-decimal widening.
    Simple(RType),
    /// Any nullable type.
    Nullable,
    /// A collection whose element type is assignable to the given type.
    CollectionSub(RType),
    /// A map whose key and value types are assignable to the given types.
    MapSub(RType, RType),
}

/// A successful argument match, possibly carrying a non-identity conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgTypeMatch {
    Direct,
    IntegerToDecimal,
}

impl ArgTypeMatcher {
    pub fn match_type(&self, ty: &RType) -> Option<ArgTypeMatch> {
        if ty.is_error() {
            return Some(ArgTypeMatch::Direct);
        }
        match self {
            ArgTypeMatcher::Any => Some(ArgTypeMatch::Direct),
            ArgTypeMatcher::Simple(target) => {
                if target.is_assignable_from(ty) {
                    Some(ArgTypeMatch::Direct)
                } else if *target == RType::Decimal && *ty == RType::Integer {
                    Some(ArgTypeMatch::IntegerToDecimal)
                } else {
                    None
                }
            }
            ArgTypeMatcher::Nullable => match ty {
                RType::Nullable(_) => Some(ArgTypeMatch::Direct),
                _ => None,
            },
            ArgTypeMatcher::CollectionSub(elem) => match ty {
                RType::List(e) | RType::Set(e) if elem.is_assignable_from(e) => {
                    Some(ArgTypeMatch::Direct)
                }
                _ => None,
            },
            ArgTypeMatcher::MapSub(key, value) => match ty {
                RType::Map(kv) if key.is_assignable_from(&kv.0) && value.is_assignable_from(&kv.1) => {
                    Some(ArgTypeMatch::Direct)
                }
                _ => None,
            },
        }
    }
}

/// Match an argument-type tuple against a matcher list; all-or-nothing.
pub fn match_arg_types(params: &[ArgTypeMatcher], args: &[RType]) -> Option<Vec<ArgTypeMatch>> {
    if args.len() != params.len() {
        return None;
    }
    let mut res = Vec::with_capacity(args.len());
    for (param, arg) in params.iter().zip(args.iter()) {
        res.push(param.match_type(arg)?);
    }
    Some(res)
}

// ============================================================================
// Global function cases
// ============================================================================

/// One candidate case of a global system function.
#[derive(Debug, Clone)]
pub struct GlobalCase {
    pub params: CaseParams,
    pub deprecated: Option<Deprecation>,
}

impl GlobalCase {
    pub fn plain(params: CaseParams) -> GlobalCase {
        GlobalCase {
            params,
            deprecated: None,
        }
    }
}

/// Case shapes: formal matcher lists plus the handful of special signatures
/// the library needs (nullable-narrowing `require`, `empty`/`exists`,
/// variadic `print`).
#[derive(Debug, Clone)]
pub enum CaseParams {
    Formal {
        matchers: Vec<ArgTypeMatcher>,
        eval: EvalSysFn,
        sql: Option<SqlSysFn>,
        ret: RType,
    },
    /// `require(boolean[, text])`
    RequireBoolean,
    /// `require(T?[, text]) -> T` — narrows the argument.
    RequireNullable,
    /// `empty(x)` / `exists(x)` over a nullable or a collection.
    EmptyCheck { negated: bool },
    /// `print(...)` — any number of arguments of any type.
    Print,
}

/// A matched case: conversions plus everything needed to build the call.
#[derive(Debug, Clone)]
pub struct GlobalCaseMatch {
    pub conversions: Vec<ArgTypeMatch>,
    pub kind: CaseMatchKind,
    pub deprecated: Option<Deprecation>,
}

#[derive(Debug, Clone)]
pub enum CaseMatchKind {
    Fixed {
        eval: EvalSysFn,
        sql: Option<SqlSysFn>,
        ret: RType,
    },
    RequireBoolean,
    RequireNullable {
        ret: RType,
    },
    EmptyNullable {
        negated: bool,
    },
    EmptyCollection {
        negated: bool,
    },
    Print,
}

impl GlobalCase {
    pub fn match_args(&self, arg_types: &[RType]) -> Option<GlobalCaseMatch> {
        let (conversions, kind) = match &self.params {
            CaseParams::Formal {
                matchers,
                eval,
                sql,
                ret,
            } => {
                let conv = match_arg_types(matchers, arg_types)?;
                (
                    conv,
                    CaseMatchKind::Fixed {
                        eval: *eval,
                        sql: *sql,
                        ret: ret.clone(),
                    },
                )
            }
            CaseParams::RequireBoolean => {
                Self::match_require(arg_types, &ArgTypeMatcher::Simple(RType::Boolean))?;
                (
                    vec![ArgTypeMatch::Direct; arg_types.len()],
                    CaseMatchKind::RequireBoolean,
                )
            }
            CaseParams::RequireNullable => {
                Self::match_require(arg_types, &ArgTypeMatcher::Nullable)?;
                let ret = arg_types[0].unwrap_nullable().clone();
                (
                    vec![ArgTypeMatch::Direct; arg_types.len()],
                    CaseMatchKind::RequireNullable { ret },
                )
            }
            CaseParams::EmptyCheck { negated } => {
                if arg_types.len() != 1 {
                    return None;
                }
                let kind = match &arg_types[0] {
                    RType::Nullable(_) => CaseMatchKind::EmptyNullable { negated: *negated },
                    RType::List(_) | RType::Set(_) | RType::Map(_) => {
                        CaseMatchKind::EmptyCollection { negated: *negated }
                    }
                    RType::Error => CaseMatchKind::EmptyNullable { negated: *negated },
                    _ => return None,
                };
                (vec![ArgTypeMatch::Direct], kind)
            }
            CaseParams::Print => (
                vec![ArgTypeMatch::Direct; arg_types.len()],
                CaseMatchKind::Print,
            ),
        };
        Some(GlobalCaseMatch {
            conversions,
            kind,
            deprecated: self.deprecated.clone(),
        })
    }

    /// `require` shapes: the checked value plus an optional text message.
    fn match_require(arg_types: &[RType], first: &ArgTypeMatcher) -> Option<()> {
        if arg_types.is_empty() || arg_types.len() > 2 {
            return None;
        }
        first.match_type(&arg_types[0])?;
        if arg_types.len() == 2 {
            ArgTypeMatcher::Simple(RType::Text).match_type(&arg_types[1])?;
        }
        Some(())
    }
}

// ============================================================================
// Member function cases
// ============================================================================

/// One candidate case of a member function on some receiver type.
#[derive(Debug, Clone)]
pub struct MemberCase {
    pub matchers: Vec<ArgTypeMatcher>,
    pub eval: EvalSysFn,
    pub sql: Option<SqlSysFn>,
    pub ret: RType,
    pub deprecated: Option<Deprecation>,
}

#[derive(Debug, Clone)]
pub struct MemberCaseMatch {
    pub conversions: Vec<ArgTypeMatch>,
    pub eval: EvalSysFn,
    pub sql: Option<SqlSysFn>,
    pub ret: RType,
    pub deprecated: Option<Deprecation>,
}

impl MemberCase {
    pub fn new(
        matchers: Vec<ArgTypeMatcher>,
        eval: EvalSysFn,
        sql: Option<SqlSysFn>,
        ret: RType,
    ) -> MemberCase {
        MemberCase {
            matchers,
            eval,
            sql,
            ret,
            deprecated: None,
        }
    }

    /// Wrap this case as a deprecated alias; matching is unaffected, a
    /// diagnostic is appended on successful match.
    pub fn deprecated(mut self, use_instead: &str) -> MemberCase {
        self.deprecated = Some(Deprecation {
            use_instead: use_instead.to_string(),
            error: false,
        });
        self
    }

    pub fn match_args(&self, arg_types: &[RType]) -> Option<MemberCaseMatch> {
        let conversions = match_arg_types(&self.matchers, arg_types)?;
        Some(MemberCaseMatch {
            conversions,
            eval: self.eval,
            sql: self.sql,
            ret: self.ret.clone(),
            deprecated: self.deprecated.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_matcher_assignable_and_widening() {
        let m = ArgTypeMatcher::Simple(RType::Decimal);
        assert_eq!(m.match_type(&RType::Decimal), Some(ArgTypeMatch::Direct));
        assert_eq!(
            m.match_type(&RType::Integer),
            Some(ArgTypeMatch::IntegerToDecimal)
        );
        assert_eq!(m.match_type(&RType::Text), None);
    }

    #[test]
    fn nullable_matcher() {
        let m = ArgTypeMatcher::Nullable;
        assert!(m.match_type(&RType::nullable(RType::Integer)).is_some());
        assert!(m.match_type(&RType::Integer).is_none());
        assert!(m.match_type(&RType::Null).is_none());
    }

    #[test]
    fn collection_matcher() {
        let m = ArgTypeMatcher::CollectionSub(RType::Integer);
        assert!(m.match_type(&RType::list(RType::Integer)).is_some());
        assert!(m.match_type(&RType::Set(Box::new(RType::Integer))).is_some());
        assert!(m.match_type(&RType::list(RType::Text)).is_none());
        assert!(m.match_type(&RType::Integer).is_none());
    }

    #[test]
    fn map_matcher() {
        let m = ArgTypeMatcher::MapSub(RType::Text, RType::Integer);
        assert!(m.match_type(&RType::map(RType::Text, RType::Integer)).is_some());
        assert!(m.match_type(&RType::map(RType::Integer, RType::Integer)).is_none());
    }

    #[test]
    fn arity_mismatch_rejects() {
        let params = vec![ArgTypeMatcher::Simple(RType::Integer)];
        assert!(match_arg_types(&params, &[]).is_none());
        assert!(match_arg_types(&params, &[RType::Integer, RType::Integer]).is_none());
    }

    #[test]
    fn require_cases_first_match_wins_in_order() {
        // require(boolean) registered before require(T?): a boolean argument
        // takes the first case, a nullable argument falls to the second.
        let cases = vec![
            GlobalCase::plain(CaseParams::RequireBoolean),
            GlobalCase::plain(CaseParams::RequireNullable),
        ];

        let args = [RType::Boolean];
        let hit = cases.iter().find_map(|c| c.match_args(&args)).unwrap();
        assert!(matches!(hit.kind, CaseMatchKind::RequireBoolean));

        let args = [RType::nullable(RType::Integer)];
        let hit = cases.iter().find_map(|c| c.match_args(&args)).unwrap();
        match hit.kind {
            CaseMatchKind::RequireNullable { ret } => assert_eq!(ret, RType::Integer),
            other => panic!("wrong case: {other:?}"),
        }
    }

    #[test]
    fn repeated_resolution_is_deterministic() {
        let cases = vec![
            GlobalCase::plain(CaseParams::Formal {
                matchers: vec![ArgTypeMatcher::Simple(RType::Integer)],
                eval: EvalSysFn::Abs,
                sql: Some(SqlSysFn::Abs),
                ret: RType::Integer,
            }),
            GlobalCase::plain(CaseParams::Formal {
                matchers: vec![ArgTypeMatcher::Simple(RType::Decimal)],
                eval: EvalSysFn::Abs,
                sql: Some(SqlSysFn::Abs),
                ret: RType::Decimal,
            }),
        ];
        let args = [RType::Integer];
        for _ in 0..3 {
            let hit = cases.iter().find_map(|c| c.match_args(&args)).unwrap();
            let CaseMatchKind::Fixed { ret, .. } = &hit.kind else {
                panic!("wrong case");
            };
            assert_eq!(*ret, RType::Integer);
            assert_eq!(hit.conversions, vec![ArgTypeMatch::Direct]);
        }
    }

    #[test]
    fn integer_to_decimal_case_order_matters() {
        // with only the decimal case, an integer argument matches with a
        // widening conversion — registration order is the contract
        let cases = vec![GlobalCase::plain(CaseParams::Formal {
            matchers: vec![ArgTypeMatcher::Simple(RType::Decimal)],
            eval: EvalSysFn::Abs,
            sql: Some(SqlSysFn::Abs),
            ret: RType::Decimal,
        })];
        let hit = cases
            .iter()
            .find_map(|c| c.match_args(&[RType::Integer]))
            .unwrap();
        assert_eq!(hit.conversions, vec![ArgTypeMatch::IntegerToDecimal]);
    }

    #[test]
    fn empty_check_discriminates_receiver_shape() {
        let case = GlobalCase::plain(CaseParams::EmptyCheck { negated: false });
        let hit = case.match_args(&[RType::nullable(RType::Text)]).unwrap();
        assert!(matches!(hit.kind, CaseMatchKind::EmptyNullable { negated: false }));

        let hit = case.match_args(&[RType::list(RType::Text)]).unwrap();
        assert!(matches!(hit.kind, CaseMatchKind::EmptyCollection { negated: false }));

        assert!(case.match_args(&[RType::Integer]).is_none());
    }
}
