//! Error types shared by the store, the predicate compiler and the I/O collaborators.

use std::fmt::{Display, Formatter};

/// The kind of entity a lookup was performed against.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EntityKind {
    Account,
    Category,
    Operation,
    Watch,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Account => "account",
            EntityKind::Category => "category",
            EntityKind::Operation => "operation",
            EntityKind::Watch => "watch",
        };
        f.write_str(s)
    }
}

/// Errors returned by this crate.
///
/// `Uninitialized` and `NotFound` are precondition failures: they indicate a programming error in
/// the caller and are not expected to be recovered from. `EmptyCombinator` is raised while a
/// predicate is being compiled, never while it is evaluated. Everything that comes from the file
/// system, the network or serde is carried by `Io`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("the store has not been initialized")]
    Uninitialized,

    #[error("{kind} not found: '{key}'")]
    NotFound { kind: EntityKind, key: String },

    #[error("'{combinator}' predicate must not be empty")]
    EmptyCombinator { combinator: &'static str },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn not_found(kind: EntityKind, key: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            key: key.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
