//! Process-unique identifiers for compiler entities.
//!
//! Counters live on the owning context object and are handed down by
//! reference — there are no process-wide singletons, so independent
//! compilations never share id spaces.

use xxhash_rust::xxh64::xxh64;

use crate::name::QualifiedName;

/// A monotonic id generator owned by a context object.
#[derive(Debug, Default)]
pub struct UidGen {
    next: u64,
}

impl UidGen {
    pub fn new() -> UidGen {
        UidGen { next: 0 }
    }

    pub fn next(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Identity of a compiled function/operation/query body. Distinguishes
/// variables of the same name living in different bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnUid {
    pub id: u64,
    pub name: String,
}

/// Identity of a variable binding, distinct from its storage slot: the same
/// source variable keeps one uid however many scopes reference it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarUid {
    pub id: u64,
    pub name: String,
    pub fn_uid: FnUid,
}

/// Identity of a frame block inside a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockUid(pub u64);

/// Stable machine identity of a definition, derived from its qualified name.
///
/// Used as the key of the frozen app maps and as an opaque graph vertex; two
/// compilations of the same source produce identical hashes, which keeps
/// golden-file output stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefHash(pub u64);

impl DefHash {
    pub fn of(name: &QualifiedName) -> DefHash {
        DefHash(xxh64(name.str().as_bytes(), 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::{ModuleName, RName};

    #[test]
    fn uid_gen_is_monotonic() {
        let mut g = UidGen::new();
        assert_eq!(g.next(), 0);
        assert_eq!(g.next(), 1);
        assert_eq!(g.next(), 2);
    }

    #[test]
    fn def_hash_is_stable() {
        let q = QualifiedName::new(ModuleName::root(), vec![RName::of("user")]);
        let q2 = QualifiedName::new(ModuleName::root(), vec![RName::of("user")]);
        assert_eq!(DefHash::of(&q), DefHash::of(&q2));

        let other = QualifiedName::new(ModuleName::root(), vec![RName::of("account")]);
        assert_ne!(DefHash::of(&q), DefHash::of(&other));
    }
}
