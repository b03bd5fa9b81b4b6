//! The system function library: case tables.
//!
//! Case registration order is part of the public contract — resolution is
//! first-match-wins, so the integer overloads are registered before the
//! decimal ones and must stay that way.

use quill_core::{EvalSysFn, RName, RType, SqlSysFn};
use quill_registry::SysFnId;

use crate::cases::{ArgTypeMatcher, CaseParams, GlobalCase, MemberCase};

fn formal(
    matchers: Vec<ArgTypeMatcher>,
    eval: EvalSysFn,
    sql: Option<SqlSysFn>,
    ret: RType,
) -> GlobalCase {
    GlobalCase::plain(CaseParams::Formal {
        matchers,
        eval,
        sql,
        ret,
    })
}

/// The case list of a global system function, in registration order.
pub fn global_cases(id: SysFnId) -> Vec<GlobalCase> {
    use ArgTypeMatcher::Simple;
    match id {
        SysFnId::Require => vec![
            GlobalCase::plain(CaseParams::RequireBoolean),
            GlobalCase::plain(CaseParams::RequireNullable),
        ],
        SysFnId::Empty => vec![GlobalCase::plain(CaseParams::EmptyCheck { negated: false })],
        SysFnId::Exists => vec![GlobalCase::plain(CaseParams::EmptyCheck { negated: true })],
        SysFnId::Abs => vec![
            formal(
                vec![Simple(RType::Integer)],
                EvalSysFn::Abs,
                Some(SqlSysFn::Abs),
                RType::Integer,
            ),
            formal(
                vec![Simple(RType::Decimal)],
                EvalSysFn::Abs,
                Some(SqlSysFn::Abs),
                RType::Decimal,
            ),
        ],
        SysFnId::Min => vec![
            formal(
                vec![Simple(RType::Integer), Simple(RType::Integer)],
                EvalSysFn::Min,
                Some(SqlSysFn::Min),
                RType::Integer,
            ),
            formal(
                vec![Simple(RType::Decimal), Simple(RType::Decimal)],
                EvalSysFn::Min,
                Some(SqlSysFn::Min),
                RType::Decimal,
            ),
        ],
        SysFnId::Max => vec![
            formal(
                vec![Simple(RType::Integer), Simple(RType::Integer)],
                EvalSysFn::Max,
                Some(SqlSysFn::Max),
                RType::Integer,
            ),
            formal(
                vec![Simple(RType::Decimal), Simple(RType::Decimal)],
                EvalSysFn::Max,
                Some(SqlSysFn::Max),
                RType::Decimal,
            ),
        ],
        SysFnId::Print => vec![GlobalCase::plain(CaseParams::Print)],
        SysFnId::IntegerFromText => vec![formal(
            vec![Simple(RType::Text)],
            EvalSysFn::IntegerFromText,
            None,
            RType::Integer,
        )],
    }
}

/// The case list of a member function for a receiver type; empty when the
/// receiver has no such member.
pub fn member_cases(recv: &RType, name: &RName) -> Vec<MemberCase> {
    match (recv, name.as_str()) {
        (RType::Integer, "to_text") => vec![MemberCase::new(
            vec![],
            EvalSysFn::ToText,
            None,
            RType::Text,
        )],
        (RType::Integer, "to_hex") => vec![MemberCase::new(
            vec![],
            EvalSysFn::ToHex,
            None,
            RType::Text,
        )],
        // legacy alias kept for source compatibility
        (RType::Integer, "str") => vec![
            MemberCase::new(vec![], EvalSysFn::ToText, None, RType::Text).deprecated("to_text"),
        ],
        (RType::Decimal, "to_text") => vec![MemberCase::new(
            vec![],
            EvalSysFn::ToText,
            None,
            RType::Text,
        )],
        (RType::Text, "size") => vec![MemberCase::new(
            vec![],
            EvalSysFn::TextSize,
            Some(SqlSysFn::TextSize),
            RType::Integer,
        )],
        (RType::Text, "len") => vec![
            MemberCase::new(
                vec![],
                EvalSysFn::TextSize,
                Some(SqlSysFn::TextSize),
                RType::Integer,
            )
            .deprecated("size"),
        ],
        (RType::Text, "upper_case") => vec![MemberCase::new(
            vec![],
            EvalSysFn::TextUpperCase,
            Some(SqlSysFn::TextUpperCase),
            RType::Text,
        )],
        (RType::Text, "lower_case") => vec![MemberCase::new(
            vec![],
            EvalSysFn::TextLowerCase,
            Some(SqlSysFn::TextLowerCase),
            RType::Text,
        )],
        (RType::ByteArray, "size") => vec![MemberCase::new(
            vec![],
            EvalSysFn::ByteArraySize,
            None,
            RType::Integer,
        )],
        (RType::List(_) | RType::Set(_) | RType::Map(_), "size") => vec![MemberCase::new(
            vec![],
            EvalSysFn::CollectionSize,
            None,
            RType::Integer,
        )],
        (RType::List(_) | RType::Set(_) | RType::Map(_), "empty") => vec![MemberCase::new(
            vec![],
            EvalSysFn::CollectionEmpty,
            None,
            RType::Boolean,
        )],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_integer_case_is_registered_first() {
        let cases = global_cases(SysFnId::Abs);
        let hit = cases
            .iter()
            .find_map(|c| c.match_args(&[RType::Integer]))
            .unwrap();
        let crate::cases::CaseMatchKind::Fixed { ret, .. } = hit.kind else {
            panic!("formal case expected");
        };
        // the integer case wins even though the decimal case would also
        // accept an integer via widening
        assert_eq!(ret, RType::Integer);
    }

    #[test]
    fn unknown_member_is_empty() {
        assert!(member_cases(&RType::Integer, &RName::of("nope")).is_empty());
        assert!(member_cases(&RType::Boolean, &RName::of("size")).is_empty());
    }

    #[test]
    fn deprecated_alias_matches_with_marker() {
        let cases = member_cases(&RType::Text, &RName::of("len"));
        let hit = cases[0].match_args(&[]).unwrap();
        assert!(hit.deprecated.is_some());
        assert_eq!(hit.ret, RType::Integer);
    }

    #[test]
    fn collection_members() {
        let cases = member_cases(&RType::list(RType::Integer), &RName::of("size"));
        assert_eq!(cases.len(), 1);
        let cases = member_cases(&RType::list(RType::Integer), &RName::of("empty"));
        assert_eq!(cases[0].ret, RType::Boolean);
    }
}
