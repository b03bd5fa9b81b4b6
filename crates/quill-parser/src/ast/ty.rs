//! Type reference nodes.

use quill_core::Span;

use super::{Name, QualName};

#[derive(Debug, Clone)]
pub enum TypeRef {
    /// A possibly dotted type name.
    Name(QualName),
    Nullable {
        inner: Box<TypeRef>,
        pos: Span,
    },
    List {
        elem: Box<TypeRef>,
        pos: Span,
    },
    Set {
        elem: Box<TypeRef>,
        pos: Span,
    },
    Map {
        key: Box<TypeRef>,
        value: Box<TypeRef>,
        pos: Span,
    },
    Tuple {
        fields: Vec<(Option<Name>, TypeRef)>,
        pos: Span,
    },
}

impl TypeRef {
    pub fn pos(&self) -> Span {
        match self {
            TypeRef::Name(q) => q.pos(),
            TypeRef::Nullable { pos, .. }
            | TypeRef::List { pos, .. }
            | TypeRef::Set { pos, .. }
            | TypeRef::Map { pos, .. }
            | TypeRef::Tuple { pos, .. } => *pos,
        }
    }
}
