//! The resolved type model.
//!
//! `RType` is a closed sum over every type the language can express. Entity
//! and struct types reference their definitions by `Rc` and compare by
//! definition identity; everything else compares structurally.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::defs::{EntityDef, StructDef};

bitflags! {
    /// Per-type content properties used by the structural-flags computation.
    ///
    /// `MUTABLE` means the value's content can change in place (collections,
    /// structs with mutable attributes). `GTV_FROM`/`GTV_TO` are the two
    /// serialization-mode compatibilities (deserialize / serialize).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeFlags: u8 {
        const MUTABLE = 1;
        const GTV_FROM = 2;
        const GTV_TO = 4;
    }
}

impl TypeFlags {
    pub fn gtv_both() -> TypeFlags {
        TypeFlags::GTV_FROM | TypeFlags::GTV_TO
    }
}

/// A field of a tuple type; the name is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleField {
    pub name: Option<crate::name::RName>,
    pub ty: RType,
}

/// A resolved type.
#[derive(Debug, Clone)]
pub enum RType {
    Unit,
    Boolean,
    Integer,
    Decimal,
    Text,
    ByteArray,
    Rowid,
    /// The type of the `null` literal; assignable to every nullable type.
    Null,
    Nullable(Box<RType>),
    Entity(Rc<EntityDef>),
    Struct(Rc<StructDef>),
    List(Box<RType>),
    Set(Box<RType>),
    Map(Box<(RType, RType)>),
    Tuple(Vec<TupleField>),
    /// Placeholder produced by error recovery; assignable to and from
    /// everything so one mistake does not cascade.
    Error,
}

impl PartialEq for RType {
    fn eq(&self, other: &RType) -> bool {
        use RType::*;
        match (self, other) {
            (Unit, Unit)
            | (Boolean, Boolean)
            | (Integer, Integer)
            | (Decimal, Decimal)
            | (Text, Text)
            | (ByteArray, ByteArray)
            | (Rowid, Rowid)
            | (Null, Null)
            | (Error, Error) => true,
            (Nullable(a), Nullable(b)) => a == b,
            (Entity(a), Entity(b)) => Rc::ptr_eq(a, b),
            (Struct(a), Struct(b)) => Rc::ptr_eq(a, b),
            (List(a), List(b)) => a == b,
            (Set(a), Set(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Tuple(a), Tuple(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for RType {}

impl RType {
    pub fn nullable(inner: RType) -> RType {
        match inner {
            RType::Nullable(_) | RType::Null | RType::Unit | RType::Error => inner,
            t => RType::Nullable(Box::new(t)),
        }
    }

    pub fn list(elem: RType) -> RType {
        RType::List(Box::new(elem))
    }

    pub fn map(key: RType, value: RType) -> RType {
        RType::Map(Box::new((key, value)))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RType::Error)
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, RType::Nullable(_) | RType::Null)
    }

    /// The non-null part of a nullable type; identity otherwise.
    pub fn unwrap_nullable(&self) -> &RType {
        match self {
            RType::Nullable(t) => t,
            t => t,
        }
    }

    /// Whether a value of type `src` may be used where `self` is expected,
    /// without conversion.
    pub fn is_assignable_from(&self, src: &RType) -> bool {
        if self == src || self.is_error() || src.is_error() {
            return true;
        }
        match self {
            RType::Nullable(inner) => match src {
                RType::Null => true,
                RType::Nullable(s) => inner.is_assignable_from(s),
                s => inner.is_assignable_from(s),
            },
            _ => false,
        }
    }

    /// The least common supertype of two types, if one exists.
    pub fn common_type(a: &RType, b: &RType) -> Option<RType> {
        if a == b {
            return Some(a.clone());
        }
        if a.is_error() {
            return Some(b.clone());
        }
        if b.is_error() {
            return Some(a.clone());
        }
        match (a, b) {
            (RType::Null, RType::Nullable(_)) => Some(b.clone()),
            (RType::Nullable(_), RType::Null) => Some(a.clone()),
            (RType::Null, t) | (t, RType::Null) => Some(RType::nullable(t.clone())),
            (RType::Nullable(x), RType::Nullable(y)) => {
                Self::common_type(x, y).map(RType::nullable)
            }
            (RType::Nullable(x), y) | (y, RType::Nullable(x)) => {
                Self::common_type(x, y).map(RType::nullable)
            }
            _ => None,
        }
    }

    /// The database representability predicate: can a value of this type
    /// appear in a predicate-form expression (i.e. map to an SQL column)?
    pub fn is_sql_compatible(&self) -> bool {
        match self {
            RType::Boolean
            | RType::Integer
            | RType::Decimal
            | RType::Text
            | RType::ByteArray
            | RType::Rowid
            | RType::Entity(_)
            | RType::Error => true,
            RType::Nullable(t) => t.is_sql_compatible(),
            _ => false,
        }
    }

    /// Shallow content flags: struct components are treated as fully
    /// compatible and non-mutable here — their contribution is spread
    /// through the dependency graph afterwards.
    pub fn flags_shallow(&self) -> TypeFlags {
        match self {
            RType::Unit => TypeFlags::empty(),
            RType::Boolean
            | RType::Integer
            | RType::Decimal
            | RType::Text
            | RType::ByteArray
            | RType::Rowid
            | RType::Null
            | RType::Entity(_)
            | RType::Struct(_)
            | RType::Error => TypeFlags::gtv_both(),
            RType::Nullable(t) => t.flags_shallow(),
            RType::List(t) | RType::Set(t) => t.flags_shallow() | TypeFlags::MUTABLE,
            RType::Map(kv) => {
                (kv.0.flags_shallow() & kv.1.flags_shallow() & TypeFlags::gtv_both())
                    | TypeFlags::MUTABLE
            }
            RType::Tuple(fields) => fields
                .iter()
                .fold(TypeFlags::gtv_both(), |acc, f| {
                    let ff = f.ty.flags_shallow();
                    (acc & ff & TypeFlags::gtv_both()) | (ff & TypeFlags::MUTABLE) | (acc & TypeFlags::MUTABLE)
                }),
        }
    }

    /// Collect every struct referenced anywhere in this type.
    pub fn component_structs(&self, out: &mut Vec<Rc<StructDef>>) {
        match self {
            RType::Struct(s) => out.push(s.clone()),
            RType::Nullable(t) | RType::List(t) | RType::Set(t) => t.component_structs(out),
            RType::Map(kv) => {
                kv.0.component_structs(out);
                kv.1.component_structs(out);
            }
            RType::Tuple(fields) => {
                for f in fields {
                    f.ty.component_structs(out);
                }
            }
            _ => {}
        }
    }

    /// Collect structs included *by value* (no nullable or collection
    /// indirection). A cycle along these edges makes a struct infinite.
    pub fn direct_inclusion_structs(&self, out: &mut Vec<Rc<StructDef>>) {
        match self {
            RType::Struct(s) => out.push(s.clone()),
            RType::Tuple(fields) => {
                for f in fields {
                    f.ty.direct_inclusion_structs(out);
                }
            }
            _ => {}
        }
    }

    /// Collect every entity referenced anywhere in this type.
    pub fn component_entities(&self, out: &mut Vec<Rc<EntityDef>>) {
        match self {
            RType::Entity(e) => out.push(e.clone()),
            RType::Nullable(t) | RType::List(t) | RType::Set(t) => t.component_entities(out),
            RType::Map(kv) => {
                kv.0.component_entities(out);
                kv.1.component_entities(out);
            }
            RType::Tuple(fields) => {
                for f in fields {
                    f.ty.component_entities(out);
                }
            }
            _ => {}
        }
    }

    /// Full serialization compatibility, consulting computed struct flags.
    /// Only valid once the structural-flags stage has run.
    pub fn is_gtv_to(&self) -> bool {
        match self {
            RType::Struct(s) => s.flags().type_flags.contains(TypeFlags::GTV_TO),
            RType::Nullable(t) | RType::List(t) | RType::Set(t) => t.is_gtv_to(),
            RType::Map(kv) => kv.0.is_gtv_to() && kv.1.is_gtv_to(),
            RType::Tuple(fields) => fields.iter().all(|f| f.ty.is_gtv_to()),
            RType::Unit => false,
            _ => true,
        }
    }

    /// Display name, also used inside diagnostic codes.
    pub fn name(&self) -> String {
        match self {
            RType::Unit => "unit".into(),
            RType::Boolean => "boolean".into(),
            RType::Integer => "integer".into(),
            RType::Decimal => "decimal".into(),
            RType::Text => "text".into(),
            RType::ByteArray => "byte_array".into(),
            RType::Rowid => "rowid".into(),
            RType::Null => "null".into(),
            RType::Nullable(t) => format!("{}?", t.name()),
            RType::Entity(e) => e.name.module_level_str(),
            RType::Struct(s) => s.name.module_level_str(),
            RType::List(t) => format!("list<{}>", t.name()),
            RType::Set(t) => format!("set<{}>", t.name()),
            RType::Map(kv) => format!("map<{},{}>", kv.0.name(), kv.1.name()),
            RType::Tuple(fields) => {
                let inner = fields
                    .iter()
                    .map(|f| match &f.name {
                        Some(n) => format!("{}:{}", n, f.ty.name()),
                        None => f.ty.name(),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                format!("({inner})")
            }
            RType::Error => "<error>".into(),
        }
    }
}

impl fmt::Display for RType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_normalizes() {
        assert_eq!(RType::nullable(RType::Integer), RType::Nullable(Box::new(RType::Integer)));
        // no double wrapping
        let n = RType::nullable(RType::nullable(RType::Integer));
        assert_eq!(n, RType::nullable(RType::Integer));
        assert_eq!(RType::nullable(RType::Null), RType::Null);
    }

    #[test]
    fn assignability() {
        let int_opt = RType::nullable(RType::Integer);
        assert!(int_opt.is_assignable_from(&RType::Integer));
        assert!(int_opt.is_assignable_from(&RType::Null));
        assert!(int_opt.is_assignable_from(&int_opt));
        assert!(!RType::Integer.is_assignable_from(&int_opt));
        assert!(!RType::Integer.is_assignable_from(&RType::Text));
        assert!(RType::Integer.is_assignable_from(&RType::Error));
    }

    #[test]
    fn common_types() {
        let int_opt = RType::nullable(RType::Integer);
        assert_eq!(RType::common_type(&RType::Null, &RType::Integer), Some(int_opt.clone()));
        assert_eq!(RType::common_type(&int_opt, &RType::Integer), Some(int_opt.clone()));
        assert_eq!(RType::common_type(&RType::Integer, &RType::Integer), Some(RType::Integer));
        assert_eq!(RType::common_type(&RType::Integer, &RType::Text), None);
    }

    #[test]
    fn sql_compatibility() {
        assert!(RType::Integer.is_sql_compatible());
        assert!(RType::nullable(RType::Text).is_sql_compatible());
        assert!(!RType::list(RType::Integer).is_sql_compatible());
        assert!(!RType::Unit.is_sql_compatible());
    }

    #[test]
    fn shallow_flags() {
        assert!(RType::list(RType::Integer).flags_shallow().contains(TypeFlags::MUTABLE));
        assert!(!RType::Integer.flags_shallow().contains(TypeFlags::MUTABLE));
        assert!(!RType::Unit.flags_shallow().contains(TypeFlags::GTV_TO));
        let tup = RType::Tuple(vec![
            TupleField { name: None, ty: RType::list(RType::Integer) },
            TupleField { name: None, ty: RType::Text },
        ]);
        assert!(tup.flags_shallow().contains(TypeFlags::MUTABLE));
        assert!(tup.flags_shallow().contains(TypeFlags::GTV_TO));
    }

    #[test]
    fn type_names() {
        assert_eq!(RType::nullable(RType::Text).name(), "text?");
        assert_eq!(RType::list(RType::Integer).name(), "list<integer>");
        assert_eq!(RType::map(RType::Text, RType::Integer).name(), "map<text,integer>");
    }
}
