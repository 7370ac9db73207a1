use accordion_core::AccordionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("Error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No preset named '{0}' (try --list-presets)")]
    UnknownPreset(String),

    #[error(transparent)]
    Core(#[from] AccordionError),

    #[error("Could not write JSON: {0}")]
    Json(#[from] serde_json::Error),
}
