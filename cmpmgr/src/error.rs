//! Error types for cmpmgr.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Exit status used when a component is still unannotated after resolution.
pub const EXIT_UNANNOTATED: i32 = 2;

/// The component sub-grammar that failed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Reference,
    Unit,
    Position,
    Field,
    Trailer,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reference => "L",
            Self::Unit => "U",
            Self::Position => "P",
            Self::Field => "F",
            Self::Trailer => "trailer",
        })
    }
}

/// Errors raised while loading, editing or saving a schematic project.
///
/// There is no partial success: any of these aborts the operation that raised it.
#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory line of a component block did not match its grammar.
    #[error("invalid component {record} record, rec: \"{text}\"")]
    FormatViolation { record: Record, text: String },

    /// The designator ends in `?` and no alternate reference resolved it.
    #[error("schematic must be annotated before loading ({reference})\n\n{text}")]
    UnannotatedReference { reference: String, text: String },

    /// The root file does not start with an `EESchema Schematic File Version` line.
    #[error("missing EESchema header in {}", path.display())]
    MissingHeader { path: PathBuf },

    /// A block span no longer holds the text it was parsed from.
    #[error("component block {block} of sheet {sheet} changed since it was parsed")]
    StaleBlock { sheet: usize, block: usize },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnannotatedReference { .. } => EXIT_UNANNOTATED,
            _ => 1,
        }
    }
}

/// Errors that can occur while reading or writing the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file: {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write settings file: {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("no configuration directory available on this platform")]
    NoConfigDir,

    #[error("settings validation failed: {message}")]
    Validation { message: String },
}
