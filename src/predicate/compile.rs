use super::Predicate;
use crate::error::{Error, Result};
use crate::model::Operation;
use crate::store::Store;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

type Test = Box<dyn Fn(&Operation) -> bool + Send + Sync>;

/// A predicate that has been compiled into a closure.
///
/// Tombstones never match, but callers are expected to have dropped them already.
#[derive(Clone)]
pub struct CompiledPredicate {
    test: Arc<dyn Fn(&Operation) -> bool + Send + Sync>,
}

impl CompiledPredicate {
    pub fn matches(&self, op: &Operation) -> bool {
        (self.test)(op)
    }
}

impl Debug for CompiledPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("CompiledPredicate")
    }
}

impl Predicate {
    /// Compiles the predicate. Name references are resolved against `store` now, so a later
    /// rename does not affect an already compiled predicate.
    ///
    /// # Errors
    /// - `EmptyCombinator` if any `And`/`Or` has no operands.
    /// - `NotFound` if a `CatName` or `AccountName` does not resolve.
    /// - `Uninitialized` if a name has to be resolved and the store has not been initialized.
    pub fn compile(&self, store: &Store) -> Result<CompiledPredicate> {
        let test = compile(self, store)?;
        Ok(CompiledPredicate {
            test: Arc::from(test),
        })
    }
}

fn compile(pred: &Predicate, store: &Store) -> Result<Test> {
    let test: Test = match pred {
        Predicate::Any => Box::new(|op: &Operation| !op.is_deleted()),
        Predicate::Type(t) => {
            let t = *t;
            Box::new(move |op: &Operation| op.op_type() == Some(t))
        }
        Predicate::Cat(id) => category(id.clone()),
        Predicate::CatName(name) => category(store.category_by_name(name)?.id.clone()),
        Predicate::Uncategorized => Box::new(|op: &Operation| {
            op.categories()
                .map(|cats| cats.is_empty())
                .unwrap_or(false)
        }),
        Predicate::Account(id) => account(id.clone()),
        Predicate::AccountName(name) => account(store.account_by_name(name)?.id.clone()),
        Predicate::Tag(value) => {
            let value = value.clone();
            Box::new(move |op: &Operation| {
                op.entry()
                    .map(|e| e.tags.iter().any(|t| *t == value))
                    .unwrap_or(false)
            })
        }
        Predicate::Currency(code) => {
            let code = code.clone();
            Box::new(move |op: &Operation| {
                op.entry().map(|e| e.currency == code).unwrap_or(false)
            })
        }
        Predicate::Comment(substring) => {
            let needle = substring.to_lowercase();
            Box::new(move |op: &Operation| {
                op.entry()
                    .map(|e| {
                        e.comment
                            .as_deref()
                            .unwrap_or_default()
                            .to_lowercase()
                            .contains(&needle)
                    })
                    .unwrap_or(false)
            })
        }
        Predicate::Amount(comparison, value) => {
            let (comparison, value) = (*comparison, *value);
            Box::new(move |op: &Operation| {
                op.entry()
                    .map(|e| comparison.holds(e.amount.abs().cmp(&value)))
                    .unwrap_or(false)
            })
        }
        Predicate::And(preds) => {
            let mut tests = compile_all(preds, store, "and")?;
            if tests.len() == 1 {
                return Ok(tests.remove(0));
            }
            Box::new(move |op: &Operation| tests.iter().all(|t| t(op)))
        }
        Predicate::Or(preds) => {
            let mut tests = compile_all(preds, store, "or")?;
            if tests.len() == 1 {
                return Ok(tests.remove(0));
            }
            Box::new(move |op: &Operation| tests.iter().any(|t| t(op)))
        }
        Predicate::Not(inner) => {
            let inner = compile(inner, store)?;
            Box::new(move |op: &Operation| !op.is_deleted() && !inner(op))
        }
    };
    Ok(test)
}

fn compile_all(preds: &[Predicate], store: &Store, combinator: &'static str) -> Result<Vec<Test>> {
    if preds.is_empty() {
        return Err(Error::EmptyCombinator { combinator });
    }
    preds.iter().map(|p| compile(p, store)).collect()
}

fn category(id: String) -> Test {
    Box::new(move |op: &Operation| {
        op.categories()
            .map(|cats| cats.iter().any(|c| c.id == id))
            .unwrap_or(false)
    })
}

fn account(id: String) -> Test {
    Box::new(move |op: &Operation| {
        op.entry().map(|e| e.account.id == id).unwrap_or(false)
            || op.to_account().map(|to| to.id == id).unwrap_or(false)
    })
}
