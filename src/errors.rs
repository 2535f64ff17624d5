use thiserror::Error;

/// Failure kinds for the clustering engine and its ingest layer.
///
/// The core algorithms perform no I/O; they surface invariant violations as
/// typed errors and leave the logging of them to the caller.
#[derive(Error, Debug)]
pub enum SlashError {
    /// A record in the input stream could not be turned into a point.
    /// The message names the offending record so it can be located and fixed.
    #[error("invalid input at record {record}: {reason}")]
    InvalidInput { record : String, reason : String },

    /// The configuration document failed validation before any computation began.
    #[error("configuration error: {0}")]
    Config(String),

    /// The data admits no meaningful clustering (all points identical, D = 0, N < 2).
    /// Callers usually downgrade this to a single-cluster partition plus a warning.
    #[error("degenerate data: {0}")]
    DegenerateData(String),

    /// An internal invariant failed, such as a Hilbert round-trip mismatch.
    /// This always indicates a bug in the transform, never bad user data.
    #[error("internal invariant violated: {0}")]
    Internal(String),

    /// Errors raised while reading or writing delimited point streams.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors raised while parsing or emitting the YAML configuration document.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlashError {
    /// Build an `InvalidInput` error that names the offending record.
    pub fn invalid_input<R : Into<String>, S : Into<String>>(record : R, reason : S) -> Self {
        SlashError::InvalidInput { record : record.into(), reason : reason.into() }
    }
}

/// Crate-wide result alias.
pub type SlashResult<T> = Result<T, SlashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_names_record() {
        let error = SlashError::invalid_input("line 17", "negative coordinate -4");
        let message = format!("{}", error);
        assert!(message.contains("line 17"));
        assert!(message.contains("negative coordinate"));
    }
}
