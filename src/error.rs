// trigmap/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the trigger map library.
///
/// Lookup misses are not represented here: a path with no logical id is
/// ordinary steady-state behaviour and simply contributes nothing.
#[derive(Debug, Error)]
pub enum TrigMapError {
    /// A `"<id>:<name>"` entry that cannot be split or whose id is not an integer.
    #[error("malformed trigger map entry '{entry}': {reason}")]
    MalformedEntry { entry: String, reason: String },

    /// Two entries claim the same stripped name with different ids.
    #[error("duplicate trigger name '{name}' (ids {first} and {second})")]
    DuplicateName { name: String, first: i32, second: i32 },

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An event record in the input stream failed to decode.
    #[error("bad event record at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = TrigMapError> = std::result::Result<T, E>;
