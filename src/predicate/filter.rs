use super::Predicate;
use crate::model::{Filter, FilterMode, OpType, Selection, Watch};

impl Predicate {
    /// Translates a user-facing `Filter` into a predicate.
    ///
    /// Each dimension contributes a clause only when it is active (see `Selection::is_active`).
    /// The category clause always lets transfers and adjustments through, and an empty category id
    /// selects uncategorized operations. The search text is not part of the translation. A filter
    /// with no active dimension is `Any`.
    pub fn filter(filter: &Filter) -> Self {
        let mut clauses = Vec::new();
        if let Some(clause) = clause(&filter.op_type, |t| Predicate::op_type(*t)) {
            clauses.push(clause);
        }
        if let Some(clause) = clause(&filter.accounts, |id| Predicate::account(id.as_str())) {
            clauses.push(clause);
        }
        if let Some(clause) = clause(&filter.categories, |id| {
            if id.is_empty() {
                Predicate::uncategorized()
            } else {
                Predicate::cat(id.as_str())
            }
        }) {
            clauses.push(Predicate::or([
                Predicate::op_type(OpType::Transfer),
                Predicate::op_type(OpType::Adjustment),
                clause,
            ]));
        }
        if let Some(clause) = clause(&filter.tags, |tag| Predicate::tag(tag.as_str())) {
            clauses.push(clause);
        }

        if clauses.is_empty() {
            Predicate::any()
        } else {
            Predicate::and(clauses)
        }
    }

    /// The spending a watch keeps an eye on: its filter, restricted to expenses and refunds.
    pub fn watch(watch: &Watch) -> Self {
        Predicate::and([Predicate::filter(&watch.filter), Predicate::expense()])
    }
}

fn clause<T>(selection: &Selection<T>, leaf: impl Fn(&T) -> Predicate) -> Option<Predicate> {
    if !selection.is_active() {
        return None;
    }
    let any_of = Predicate::or(selection.selected.iter().map(leaf));
    Some(match selection.mode {
        FilterMode::Exclude => Predicate::not(any_of),
        _ => any_of,
    })
}
