use crate::fetch::TransportError;
use thiserror::Error;

/// Errors that end a single fetch/parse call.
///
/// Every variant is fatal to the call that produced it; no partial [`Feed`]
/// is ever returned alongside one.
///
/// [`Feed`]: crate::Feed
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network or HTTP-level failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The root element carries no version indicator
    #[error("no {format} version")]
    NoVersion { format: &'static str },

    /// The version indicator is not one we know. `version` is empty when an
    /// unrecognized Atom namespace comes without a `version` attribute.
    #[error("invalid {format} version{}", version_suffix(.version))]
    InvalidVersion {
        format: &'static str,
        version: String,
    },

    /// The markup could not be turned into any tree at all
    #[error("could not parse {0}")]
    Parse(String),

    /// The tree has no root element
    #[error("XML root node is missing")]
    RootMissing,

    /// Failure raised by a dialect-specific parser, passed through unchanged
    #[error("{0}")]
    Format(String),

    /// A feed file could not be read from disk
    #[error("failed to read feed file: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    /// True for the two version-indicator failures.
    pub fn is_version_error(&self) -> bool {
        matches!(
            self,
            FeedError::NoVersion { .. } | FeedError::InvalidVersion { .. }
        )
    }
}

fn version_suffix(version: &str) -> String {
    if version.is_empty() {
        String::new()
    } else {
        format!(": {version}")
    }
}
