//! Errors surfaced by loading, saving and converting stack states.

use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A document does not have the shape of a stack state, or has an unsupported version.
    #[error("invalid state document {}: {message}", path.display())]
    Schema { path: PathBuf, message: String },

    /// A `parent`, `provider` or dependency URN has no matching resource.
    #[error("resource {urn} references {reference}, which is not part of the state")]
    DanglingReference { urn: String, reference: String },

    #[error("resource urn {0} occurs more than once")]
    DuplicateUrn(String),

    /// The resources can not be put in an order where every reference points backward.
    #[error("dependency cycle: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A file of a split state can not be decoded, or an expected file is missing.
    #[error("corrupt split state at {}: {message}", path.display())]
    CorruptState { path: PathBuf, message: String },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("expected [organization/]project-name/stack-name, got {0}")]
    InvalidStackName(String),
}

impl Error {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn schema(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Schema {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::CorruptState {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
