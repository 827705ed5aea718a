use std::path::PathBuf;

use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ratiorank_core::ValidationError),

    #[error(transparent)]
    Criteria(#[from] ratiorank_core::CriteriaError),

    #[error(transparent)]
    Config(#[from] ratiorank_core::ConfigError),

    #[error("invalid input file '{path}': {source}")]
    InvalidInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read input file '{path}': {source}")]
    InputIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Criteria(_) | Self::Config(_) | Self::InvalidInput { .. } => 2,
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 4,
            Self::InputIo { .. } | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        let criteria = CliError::from(ratiorank_core::CriteriaError::UnknownCriterion {
            code: String::from("XYZ"),
        });
        assert_eq!(criteria.exit_code(), 2);

        let strict = CliError::StrictModeViolation {
            warning_count: 1,
            error_count: 0,
        };
        assert_eq!(strict.exit_code(), 5);

        let io = CliError::from(std::io::Error::other("closed pipe"));
        assert_eq!(io.exit_code(), 10);
    }
}
