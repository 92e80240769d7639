//! Case-sensitivity resolution
//!
//! Walks the pattern once, tracking inline `(?i)` / `(?-i)` switches, and
//! records the effective sensitivity of every case-aware part. The tree is
//! only borrowed; the result is a side table the lowering step reads from.

use std::collections::HashMap;
use std::marker::PhantomData;

use log::trace;

use crate::frontend::ast::{Branch, Branches, Part, Pattern};

/// Resolved sensitivity of case-aware parts, keyed by part identity.
///
/// The keys are addresses inside the borrowed tree, so the table cannot
/// outlive the pattern it was built from.
#[derive(Debug, Clone)]
pub struct CaseTable<'a> {
    sensitive: HashMap<*const Part, bool>,
    default_sensitive: bool,
    _tree: PhantomData<&'a Part>,
}

impl<'a> CaseTable<'a> {
    fn new(ignore_case: bool) -> Self {
        Self {
            sensitive: HashMap::new(),
            default_sensitive: !ignore_case,
            _tree: PhantomData,
        }
    }

    /// Resolved flag for `part`; parts the walk never reached (synthetic
    /// parts, or parts outside the tree) get the global default.
    pub fn is_case_sensitive(&self, part: &Part) -> bool {
        self.sensitive
            .get(&(part as *const Part))
            .copied()
            .unwrap_or(self.default_sensitive)
    }

    pub fn len(&self) -> usize {
        self.sensitive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensitive.is_empty()
    }

    fn record(&mut self, part: &'a Part, ignore_case: bool) {
        trace!("case: {} resolved to sensitive={}", part.kind_name(), !ignore_case);
        self.sensitive.insert(part as *const Part, !ignore_case);
    }
}

/// Resolve case sensitivity for every case-aware part of `pattern`.
///
/// `ignore_case` is the global default; inline options override it for the
/// remainder of the branch they appear in.
pub fn resolve_case(pattern: &Pattern, ignore_case: bool) -> CaseTable<'_> {
    let mut table = CaseTable::new(ignore_case);
    walk_branches(&mut table, &pattern.branches, ignore_case);
    table
}

fn walk_branches<'a>(table: &mut CaseTable<'a>, branches: &'a Branches, ignore_case: bool) {
    for branch in branches.iter() {
        walk_branch(table, branch, ignore_case);
    }
}

fn walk_branch<'a>(table: &mut CaseTable<'a>, branch: &'a Branch, mut ignore_case: bool) {
    for part in branch {
        if let Part::OptionCaseSensitivity(option) = part {
            ignore_case = option.positive;
            continue;
        }
        walk_part(table, part, ignore_case);
    }
}

fn walk_part<'a>(table: &mut CaseTable<'a>, part: &'a Part, ignore_case: bool) {
    if part.is_case_aware() {
        table.record(part, ignore_case);
    }
    if let Some(branches) = part.branches() {
        walk_branches(table, branches, ignore_case);
    }
    if let Part::ConditionalSubexpression(cond) = part {
        walk_part(table, cond.condition(), ignore_case);
        walk_branch(table, &cond.branch_true, ignore_case);
        walk_branch(table, &cond.branch_false, ignore_case);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::*;

    fn part_at<'p>(pattern: &'p Pattern, branch: usize, index: usize) -> &'p Part {
        &pattern.branches.as_slice()[branch][index]
    }

    #[test]
    fn test_global_default_applies() {
        let pattern = Pattern::with_branches(Branches::single(vec![Text::new("a").into()]));
        let sensitive = resolve_case(&pattern, false);
        assert!(sensitive.is_case_sensitive(part_at(&pattern, 0, 0)));
        let insensitive = resolve_case(&pattern, true);
        assert!(!insensitive.is_case_sensitive(part_at(&pattern, 0, 0)));
    }

    #[test]
    fn test_option_applies_to_rest_of_branch_only() {
        let mut branches = Branches::new();
        branches.push(Text::new("a"));
        branches.push(OptionCaseSensitivity::new(true));
        branches.push(Text::new("b"));
        branches.new_branch();
        branches.push(Text::new("c"));
        let pattern = Pattern::with_branches(branches);

        let table = resolve_case(&pattern, false);
        assert!(table.is_case_sensitive(part_at(&pattern, 0, 0)));
        assert!(!table.is_case_sensitive(part_at(&pattern, 0, 2)));
        assert!(table.is_case_sensitive(part_at(&pattern, 1, 0)));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_nested_containers_inherit_current_option() {
        let inner = Branches::single(vec![
            Text::new("x").into(),
            OptionCaseSensitivity::new(false).into(),
            Backreference::new(1).into(),
        ]);
        let group = Subexpression::capturing(1, inner);
        let pattern = Pattern::with_branches(Branches::single(vec![
            OptionCaseSensitivity::new(true).into(),
            group.into(),
            Charflag::new(CharflagKind::Word).into(),
        ]));

        let table = resolve_case(&pattern, false);
        let Part::Subexpression(group) = part_at(&pattern, 0, 1) else {
            panic!("expected subexpression");
        };
        let inner = &group.branches.as_slice()[0];
        assert!(!table.is_case_sensitive(&inner[0]));
        assert!(table.is_case_sensitive(&inner[2]));
        // the inner switch does not leak out of the group
        assert!(!table.is_case_sensitive(part_at(&pattern, 0, 2)));
    }

    #[test]
    fn test_conditional_parts_are_resolved() {
        let call = SubexpressionCall::new(Some(CallTarget::Name("x".into())), false);
        let cond = ConditionalSubexpression::new(
            call.into(),
            vec![Text::new("yes").into()],
            vec![Text::new("no").into()],
        )
        .unwrap();
        let pattern = Pattern::with_branches(Branches::single(vec![
            OptionCaseSensitivity::new(true).into(),
            cond.into(),
        ]));

        let table = resolve_case(&pattern, false);
        let Part::ConditionalSubexpression(cond) = part_at(&pattern, 0, 1) else {
            panic!("expected conditional");
        };
        assert!(!table.is_case_sensitive(cond.condition()));
        assert!(!table.is_case_sensitive(&cond.branch_true[0]));
        assert!(!table.is_case_sensitive(&cond.branch_false[0]));
    }

    #[test]
    fn test_pattern_is_left_untouched() {
        let pattern = Pattern::with_branches(Branches::single(vec![
            OptionCaseSensitivity::new(true).into(),
            Text::new("a").into(),
        ]));
        let before = pattern.clone();
        let _ = resolve_case(&pattern, true);
        let _ = resolve_case(&pattern, false);
        assert_eq!(pattern, before);
    }
}
