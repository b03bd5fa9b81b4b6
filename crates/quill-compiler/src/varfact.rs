//! The variable-fact engine.
//!
//! Tracks, per variable binding, whether it is definitely initialized and
//! whether it is definitely/never/maybe null. Statement compilation threads
//! fact sets functionally: each statement returns the facts it adds, and
//! join points merge branch facts against the pre-branch state.
//!
//! Both maps form a join-semilattice per key: initialization confidence
//! merges with `min` (a variable is only definitely initialized after a
//! branch if every branch initializes it), and nulled-state merges by
//! equality, disagreement collapsing to `Maybe`.

use rustc_hash::FxHashMap;

use quill_core::{RType, VarUid};

/// Three-valued knowledge about one property of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VarFact {
    No,
    Maybe,
    Yes,
}

impl VarFact {
    pub fn for_boolean(b: bool) -> VarFact {
        if b { VarFact::Yes } else { VarFact::No }
    }

    pub fn min(self, other: VarFact) -> VarFact {
        if self <= other { self } else { other }
    }
}

/// An immutable fact set: `inited` and `nulled` knowledge per variable.
/// Absence of a key means "no knowledge" — the context defaults apply
/// (`inited` defaults to `No`, `nulled` to `Maybe`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarFacts {
    pub inited: FxHashMap<VarUid, VarFact>,
    pub nulled: FxHashMap<VarUid, VarFact>,
}

impl VarFacts {
    pub fn empty() -> VarFacts {
        VarFacts::default()
    }

    pub fn of(
        inited: FxHashMap<VarUid, VarFact>,
        nulled: FxHashMap<VarUid, VarFact>,
    ) -> VarFacts {
        VarFacts { inited, nulled }
    }

    pub fn of_inited(uid: VarUid, fact: VarFact) -> VarFacts {
        let mut inited = FxHashMap::default();
        inited.insert(uid, fact);
        VarFacts {
            inited,
            nulled: FxHashMap::default(),
        }
    }

    pub fn of_nulled(uid: VarUid, fact: VarFact) -> VarFacts {
        let mut nulled = FxHashMap::default();
        nulled.insert(uid, fact);
        VarFacts {
            inited: FxHashMap::default(),
            nulled,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inited.is_empty() && self.nulled.is_empty()
    }

    /// Current initialization knowledge; unknown means not initialized.
    pub fn inited(&self, uid: &VarUid) -> VarFact {
        self.inited.get(uid).copied().unwrap_or(VarFact::No)
    }

    /// Current nulled knowledge; unknown means maybe null.
    pub fn nulled(&self, uid: &VarUid) -> VarFact {
        self.nulled.get(uid).copied().unwrap_or(VarFact::Maybe)
    }

    /// Later knowledge overrides earlier knowledge.
    pub fn put(&self, other: &VarFacts) -> VarFacts {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut res = self.clone();
        res.inited.extend(other.inited.iter().map(|(k, v)| (k.clone(), *v)));
        res.nulled.extend(other.nulled.iter().map(|(k, v)| (k.clone(), *v)));
        res
    }

    pub fn put_mut(&mut self, other: &VarFacts) {
        self.inited.extend(other.inited.iter().map(|(k, v)| (k.clone(), *v)));
        self.nulled.extend(other.nulled.iter().map(|(k, v)| (k.clone(), *v)));
    }

    /// Conjunction of two fact sets: for keys known on both sides, `inited`
    /// takes the minimum confidence and `nulled` keeps agreeing values,
    /// collapsing disagreement to `Maybe`.
    pub fn and(&self, other: &VarFacts) -> VarFacts {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut res = self.clone();
        for (k, bv) in &other.inited {
            let nv = match res.inited.get(k) {
                Some(av) => (*av).min(*bv),
                None => *bv,
            };
            res.inited.insert(k.clone(), nv);
        }
        for (k, bv) in &other.nulled {
            let nv = match res.nulled.get(k) {
                Some(av) if av != bv => VarFact::Maybe,
                Some(av) => *av,
                None => *bv,
            };
            res.nulled.insert(k.clone(), nv);
        }
        res
    }

    /// The nulled fact an assignment of `value_ty` to a variable of
    /// `var_ty` establishes. Non-nullable variables carry no nulled facts.
    pub fn var_type_to_nulled(uid: VarUid, var_ty: &RType, value_ty: &RType) -> VarFacts {
        if !matches!(var_ty, RType::Nullable(_)) {
            return VarFacts::empty();
        }
        let fact = match value_ty {
            RType::Null => VarFact::Yes,
            RType::Nullable(_) => VarFact::Maybe,
            _ => VarFact::No,
        };
        VarFacts::of_nulled(uid, fact)
    }

    /// Merge branch exit-facts at a join point. For every variable any
    /// branch mentions: all branches (falling back to the pre-branch state)
    /// must agree, otherwise the result is `Maybe`; facts equal to the
    /// pre-branch state are dropped. Branches that provably cannot fall
    /// through must be excluded by the caller before this is called.
    pub fn for_branches(prev: &VarFacts, cases: &[VarFacts]) -> VarFacts {
        let inited = Self::calc_branches(
            cases,
            |uid| prev.inited(uid),
            |facts, uid| facts.inited.get(uid).copied(),
            |facts| facts.inited.keys(),
        );
        let nulled = Self::calc_branches(
            cases,
            |uid| prev.nulled(uid),
            |facts, uid| facts.nulled.get(uid).copied(),
            |facts| facts.nulled.keys(),
        );
        VarFacts::of(inited, nulled)
    }

    fn calc_branches<'a>(
        cases: &'a [VarFacts],
        prev_get: impl Fn(&VarUid) -> VarFact,
        case_get: impl Fn(&VarFacts, &VarUid) -> Option<VarFact>,
        keys: impl Fn(&'a VarFacts) -> std::collections::hash_map::Keys<'a, VarUid, VarFact>,
    ) -> FxHashMap<VarUid, VarFact> {
        let mut all_vars: Vec<&VarUid> = Vec::new();
        for case in cases {
            for k in keys(case) {
                if !all_vars.contains(&k) {
                    all_vars.push(k);
                }
            }
        }

        let mut res = FxHashMap::default();
        for uid in all_vars {
            let prev_value = prev_get(uid);
            let mut res_value: Option<VarFact> = None;
            for case in cases {
                let value = case_get(case, uid).unwrap_or(prev_value);
                res_value = match res_value {
                    None => Some(value),
                    Some(r) if r == value => Some(r),
                    Some(_) => Some(VarFact::Maybe),
                };
            }
            if let Some(v) = res_value
                && v != prev_value
            {
                res.insert(uid.clone(), v);
            }
        }
        res
    }
}

/// Facts produced by compiling one expression: what holds when it evaluates
/// to true, to false, and unconditionally afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExprVarFacts {
    pub true_facts: VarFacts,
    pub false_facts: VarFacts,
    pub post_facts: VarFacts,
}

impl ExprVarFacts {
    pub fn empty() -> ExprVarFacts {
        ExprVarFacts::default()
    }

    pub fn of_post(post_facts: VarFacts) -> ExprVarFacts {
        ExprVarFacts {
            post_facts,
            ..ExprVarFacts::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.true_facts.is_empty() && self.false_facts.is_empty() && self.post_facts.is_empty()
    }

    pub fn and(&self, other: &ExprVarFacts) -> ExprVarFacts {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        ExprVarFacts {
            true_facts: self.true_facts.and(&other.true_facts),
            false_facts: self.false_facts.and(&other.false_facts),
            post_facts: self.post_facts.and(&other.post_facts),
        }
    }

    /// Facts for a null comparison of a variable: the true and false
    /// branches learn opposite nulled-states. `null_if_true` says which
    /// branch corresponds to "is null".
    pub fn for_null_check(var_uid: Option<&VarUid>, null_if_true: bool) -> ExprVarFacts {
        let Some(uid) = var_uid else {
            return ExprVarFacts::empty();
        };
        ExprVarFacts {
            true_facts: VarFacts::of_nulled(uid.clone(), VarFact::for_boolean(null_if_true)),
            false_facts: VarFacts::of_nulled(uid.clone(), VarFact::for_boolean(!null_if_true)),
            post_facts: VarFacts::empty(),
        }
    }

    /// Facts for an operation that asserts a variable is not null
    /// (`x!!`, `require(x)`).
    pub fn for_null_cast(pre_post: VarFacts, var_uid: Option<&VarUid>) -> ExprVarFacts {
        let post = match var_uid {
            Some(uid) => pre_post.and(&VarFacts::of_nulled(uid.clone(), VarFact::No)),
            None => pre_post,
        };
        ExprVarFacts::of_post(post)
    }

    /// Conjunction of the post-facts of sub-expressions; branch facts do not
    /// survive composition.
    pub fn for_sub_exprs(parts: &[&ExprVarFacts]) -> ExprVarFacts {
        let post = parts
            .iter()
            .fold(VarFacts::empty(), |acc, p| acc.and(&p.post_facts));
        ExprVarFacts::of_post(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::FnUid;

    fn uid(id: u64, name: &str) -> VarUid {
        VarUid {
            id,
            name: name.into(),
            fn_uid: FnUid {
                id: 0,
                name: "f".into(),
            },
        }
    }

    #[test]
    fn defaults_no_inited_maybe_nulled() {
        let f = VarFacts::empty();
        assert_eq!(f.inited(&uid(1, "x")), VarFact::No);
        assert_eq!(f.nulled(&uid(1, "x")), VarFact::Maybe);
    }

    #[test]
    fn put_overrides() {
        let x = uid(1, "x");
        let a = VarFacts::of_inited(x.clone(), VarFact::No);
        let b = VarFacts::of_inited(x.clone(), VarFact::Yes);
        assert_eq!(a.put(&b).inited(&x), VarFact::Yes);
        assert_eq!(b.put(&a).inited(&x), VarFact::No);
    }

    #[test]
    fn and_takes_min_for_inited() {
        let x = uid(1, "x");
        let a = VarFacts::of_inited(x.clone(), VarFact::Yes);
        let b = VarFacts::of_inited(x.clone(), VarFact::Maybe);
        assert_eq!(a.and(&b).inited(&x), VarFact::Maybe);
    }

    #[test]
    fn and_collapses_nulled_disagreement() {
        let x = uid(1, "x");
        let a = VarFacts::of_nulled(x.clone(), VarFact::No);
        let b = VarFacts::of_nulled(x.clone(), VarFact::Yes);
        assert_eq!(a.and(&b).nulled(&x), VarFact::Maybe);

        let c = VarFacts::of_nulled(x.clone(), VarFact::No);
        assert_eq!(a.and(&c).nulled(&x), VarFact::No);
    }

    #[test]
    fn branch_merge_both_initialized_is_yes() {
        let x = uid(1, "x");
        let prev = VarFacts::empty();
        let b1 = VarFacts::of_inited(x.clone(), VarFact::Yes);
        let b2 = VarFacts::of_inited(x.clone(), VarFact::Yes);
        let merged = VarFacts::for_branches(&prev, &[b1, b2]);
        assert_eq!(merged.inited(&x), VarFact::Yes);
    }

    #[test]
    fn branch_merge_one_branch_is_maybe() {
        let x = uid(1, "x");
        let prev = VarFacts::empty();
        let b1 = VarFacts::of_inited(x.clone(), VarFact::Yes);
        let b2 = VarFacts::empty();
        let merged = VarFacts::for_branches(&prev, &[b1, b2]);
        // one branch initializes, the other falls back to prev (No)
        assert_eq!(merged.inited.get(&x), Some(&VarFact::Maybe));
    }

    #[test]
    fn branch_merge_drops_facts_equal_to_prev() {
        let x = uid(1, "x");
        let prev = VarFacts::of_inited(x.clone(), VarFact::Yes);
        let b1 = VarFacts::of_inited(x.clone(), VarFact::Yes);
        let merged = VarFacts::for_branches(&prev, &[b1, VarFacts::empty()]);
        assert!(merged.is_empty());
    }

    #[test]
    fn null_check_splits_branches() {
        let x = uid(1, "x");
        let f = ExprVarFacts::for_null_check(Some(&x), true);
        assert_eq!(f.true_facts.nulled(&x), VarFact::Yes);
        assert_eq!(f.false_facts.nulled(&x), VarFact::No);
        assert!(f.post_facts.is_empty());

        let g = ExprVarFacts::for_null_check(None, true);
        assert!(g.is_empty());
    }

    #[test]
    fn null_cast_narrows_post() {
        let x = uid(1, "x");
        let f = ExprVarFacts::for_null_cast(VarFacts::empty(), Some(&x));
        assert_eq!(f.post_facts.nulled(&x), VarFact::No);
    }

    #[test]
    fn var_type_to_nulled_rules() {
        let x = uid(1, "x");
        let var_ty = RType::nullable(RType::Integer);
        assert_eq!(
            VarFacts::var_type_to_nulled(x.clone(), &var_ty, &RType::Null).nulled(&x),
            VarFact::Yes
        );
        assert_eq!(
            VarFacts::var_type_to_nulled(x.clone(), &var_ty, &RType::Integer).nulled(&x),
            VarFact::No
        );
        assert_eq!(
            VarFacts::var_type_to_nulled(x.clone(), &var_ty, &var_ty).nulled(&x),
            VarFact::Maybe
        );
        // non-nullable variable: no facts at all
        assert!(VarFacts::var_type_to_nulled(x, &RType::Integer, &RType::Integer).is_empty());
    }
}
