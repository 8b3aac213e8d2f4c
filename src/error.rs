// SYNOID Kinematics - Error Taxonomy
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Typed pipeline errors. Stages propagate them through anyhow so callers
// can attach file context, and batch runners recover the kind with
// `downcast_ref::<PipelineError>()`.

use std::fmt;

/// Errors raised by the pipeline stages.
#[derive(Debug)]
pub enum PipelineError {
    /// A file or video could not be read or written.
    Io(std::io::Error),
    /// A required column is absent from the table.
    MissingColumn(String),
    /// A cell or column violates the expected table schema.
    Schema {
        column: String,
        row: usize,
        reason: String,
    },
    /// The video could not be opened, probed or decoded.
    Video(String),
    /// The pose estimator failed or answered with malformed output.
    Estimator(String),
    /// The anomaly model could not be fit on the feature matrix.
    ModelFit(String),
    /// The configuration holds an invalid value.
    Config(String),
}

impl PipelineError {
    pub fn schema(column: impl Into<String>, row: usize, reason: impl Into<String>) -> Self {
        Self::Schema {
            column: column.into(),
            row,
            reason: reason.into(),
        }
    }

    /// Short label used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::MissingColumn(_) | Self::Schema { .. } => "schema",
            Self::Video(_) => "video",
            Self::Estimator(_) => "estimator",
            Self::ModelFit(_) => "model_fit",
            Self::Config(_) => "config",
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::MissingColumn(col) => write!(f, "Schema error: missing column '{col}'"),
            Self::Schema {
                column,
                row,
                reason,
            } => write!(f, "Schema error: column '{column}', row {row}: {reason}"),
            Self::Video(msg) => write!(f, "Video error: {msg}"),
            Self::Estimator(msg) => write!(f, "Estimator error: {msg}"),
            Self::ModelFit(msg) => write!(f, "Model fit error: {msg}"),
            Self::Config(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Classify an anyhow error chain by the first `PipelineError` it carries.
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .map(PipelineError::kind)
        .unwrap_or("other")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_display() {
        let err = PipelineError::MissingColumn("torso_x".to_string());
        assert_eq!(err.to_string(), "Schema error: missing column 'torso_x'");

        let err = PipelineError::schema("nose_x", 4, "missing value");
        assert_eq!(
            err.to_string(),
            "Schema error: column 'nose_x', row 4: missing value"
        );
    }

    #[test]
    fn test_kind_survives_context() {
        let res: anyhow::Result<()> = Err(PipelineError::ModelFit("empty".into()))
            .context("while filtering clip.csv");
        let err = res.unwrap_err();
        assert_eq!(error_kind(&err), "model_fit");

        let plain = anyhow::anyhow!("something else");
        assert_eq!(error_kind(&plain), "other");
    }
}
