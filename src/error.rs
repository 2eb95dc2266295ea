use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EaselError>;

/// Errors surfaced by the I/O and CLI boundary. The in-core editing types
/// report failure through `Option`/`bool` returns instead; nothing inside a
/// gesture can fail in a way worth propagating.
#[derive(Debug, Error)]
pub enum EaselError {
    #[error("could not read '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("could not write '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no input files matched the given pattern(s)")]
    NoInputs,

    #[error("unknown blend mode '{0}'")]
    UnknownBlendMode(String),

    #[error("invalid color '{0}': expected 6 or 8 hex digits")]
    InvalidColor(String),
}
