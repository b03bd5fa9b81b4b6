//! Names: simple identifiers, module names, qualified definition names and
//! mount names.
//!
//! All name types are cheap to clone (`Rc<str>` payloads) because they are
//! copied into scopes, fact maps and frozen definitions freely.

use std::fmt;
use std::rc::Rc;

macro_rules! fmt_via_str {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.str())
            }
        }
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.str())
            }
        }
    };
}

/// A validated simple identifier.
///
/// The parser guarantees the identifier shape; `RName::new` re-checks it so
/// that programmatically built syntax trees cannot smuggle invalid names in.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RName(Rc<str>);

impl RName {
    /// Create a name, panicking on an invalid identifier. Intended for
    /// compiler-internal and test names that are known-good literals.
    pub fn of(s: &str) -> RName {
        Self::new(s).unwrap_or_else(|| panic!("invalid name: '{s}'"))
    }

    /// Create a name if `s` is a valid identifier.
    pub fn new(s: &str) -> Option<RName> {
        if Self::is_valid(s) {
            Some(RName(Rc::from(s)))
        } else {
            None
        }
    }

    pub fn is_valid(s: &str) -> bool {
        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A module name: a possibly empty sequence of simple names.
///
/// The empty sequence is the root module.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ModuleName(Vec<RName>);

impl ModuleName {
    pub const fn root() -> ModuleName {
        ModuleName(Vec::new())
    }

    pub fn new(parts: Vec<RName>) -> ModuleName {
        ModuleName(parts)
    }

    /// Parse a dotted module name. Empty string is the root module.
    pub fn parse(s: &str) -> Option<ModuleName> {
        if s.is_empty() {
            return Some(Self::root());
        }
        let parts = s
            .split('.')
            .map(RName::new)
            .collect::<Option<Vec<_>>>()?;
        Some(ModuleName(parts))
    }

    pub fn parts(&self) -> &[RName] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn str(&self) -> String {
        self.0
            .iter()
            .map(RName::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }
}

fmt_via_str!(ModuleName);

/// The fully qualified name of a definition: owning module plus the
/// namespace path down to the simple name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub module: ModuleName,
    pub path: Vec<RName>,
}

impl QualifiedName {
    pub fn new(module: ModuleName, path: Vec<RName>) -> QualifiedName {
        assert!(!path.is_empty(), "qualified name without a simple name");
        QualifiedName { module, path }
    }

    /// The last path segment.
    pub fn simple(&self) -> &RName {
        self.path.last().unwrap()
    }

    /// Name as seen from inside the module: the path without the module part.
    pub fn module_level_str(&self) -> String {
        self.path
            .iter()
            .map(RName::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Full name including the module: `module.path:ns.name` for non-root
    /// modules, `ns.name` for the root module.
    pub fn str(&self) -> String {
        let local = self.module_level_str();
        if self.module.is_root() {
            local
        } else {
            format!("{}:{}", self.module.str(), local)
        }
    }
}

fmt_via_str!(QualifiedName);

/// The relational mount point of an entity, operation or query: the name the
/// back end maps to a table or a callable endpoint.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct MountName(Vec<RName>);

impl MountName {
    pub const fn empty() -> MountName {
        MountName(Vec::new())
    }

    pub fn new(parts: Vec<RName>) -> MountName {
        MountName(parts)
    }

    /// Extend this mount name with further segments.
    pub fn child(&self, parts: &[RName]) -> MountName {
        let mut all = self.0.clone();
        all.extend(parts.iter().cloned());
        MountName(all)
    }

    pub fn parts(&self) -> &[RName] {
        &self.0
    }

    pub fn str(&self) -> String {
        self.0
            .iter()
            .map(RName::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }
}

fmt_via_str!(MountName);
