//! The predefined system namespace.
//!
//! The outermost scope every module resolution falls back to: primitive type
//! names and the system function library. System functions are identified
//! here; their overload cases and bodies live in the compiler.

use std::rc::Rc;

use quill_core::{RName, RType};

use crate::namespace::{Namespace, NamespaceBuilder, NamespaceRef, NsDef, NsFunction};

/// Identity of a system function namespace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysFnId {
    Require,
    Empty,
    Exists,
    Abs,
    Min,
    Max,
    Print,
    IntegerFromText,
}

impl SysFnId {
    pub fn name(&self) -> &'static str {
        match self {
            SysFnId::Require => "require",
            SysFnId::Empty => "empty",
            SysFnId::Exists => "exists",
            SysFnId::Abs => "abs",
            SysFnId::Min => "min",
            SysFnId::Max => "max",
            SysFnId::Print => "print",
            SysFnId::IntegerFromText => "integer.from_text",
        }
    }
}

/// Build the system namespace.
pub fn system_namespace() -> Rc<Namespace> {
    let mut b = NamespaceBuilder::new();

    for (name, ty) in [
        ("unit", RType::Unit),
        ("boolean", RType::Boolean),
        ("integer", RType::Integer),
        ("decimal", RType::Decimal),
        ("text", RType::Text),
        ("byte_array", RType::ByteArray),
        ("rowid", RType::Rowid),
    ] {
        b.add_type(RName::of(name), NsDef::plain(ty));
    }

    for id in [
        SysFnId::Require,
        SysFnId::Empty,
        SysFnId::Exists,
        SysFnId::Abs,
        SysFnId::Min,
        SysFnId::Max,
        SysFnId::Print,
    ] {
        b.add_function(RName::of(id.name()), NsDef::plain(NsFunction::Sys(id)));
    }

    // `integer` is both a type and a namespace; one of the predefined names
    // intentionally occupying two partitions.
    let mut int_ns = NamespaceBuilder::new();
    int_ns.add_function(
        RName::of("from_text"),
        NsDef::plain(NsFunction::Sys(SysFnId::IntegerFromText)),
    );
    b.add_namespace(
        RName::of("integer"),
        NsDef::plain(NamespaceRef::Inline(int_ns.build())),
    );

    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_and_functions_are_present() {
        let ns = system_namespace();
        assert!(ns.ty(&RName::of("integer")).is_some());
        assert!(ns.ty(&RName::of("text")).is_some());
        assert!(ns.function(&RName::of("require")).is_some());
        assert!(ns.function(&RName::of("abs")).is_some());
        assert!(ns.value(&RName::of("integer")).is_none());
    }

    #[test]
    fn integer_is_type_and_namespace() {
        let ns = system_namespace();
        assert!(ns.ty(&RName::of("integer")).is_some());
        let int_ns = ns.namespace(&RName::of("integer")).unwrap();
        let NamespaceRef::Inline(inner) = &int_ns.def else {
            panic!("expected inline namespace");
        };
        assert!(inner.function(&RName::of("from_text")).is_some());
    }
}
