use std::fmt;

use thiserror::Error;

/// The processing stage a sample was in when it failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    VarianceEstimation,
    Optimisation,
    Covariance,
    Reparameterisation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extraction => "atomic ratio extraction",
            Self::VarianceEstimation => "variance estimation",
            Self::Optimisation => "optimisation",
            Self::Covariance => "covariance estimation",
            Self::Reparameterisation => "reparameterisation",
        };
        f.write_str(name)
    }
}

/// Coarse classification of an [`Error`], ignoring which sample it came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Numerical,
    InputShape,
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    /// A channel role is unmapped, or a method and column schema disagree
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Non-convergence, a singular matrix or a non-finite intermediate result
    #[error("numerical error: {0}")]
    Numerical(String),
    /// Series of unequal length, or too short for the variance window
    #[error("input shape error: {0}")]
    InputShape(String),
    #[error("sample `{sample}` failed during {stage}: {source}")]
    Sample {
        sample: String,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to write table: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// The root kind of the error, looking through any per-sample wrapping
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Numerical(_) => ErrorKind::Numerical,
            Self::InputShape(_) => ErrorKind::InputShape,
            Self::Sample { source, .. } => source.kind(),
            Self::Toml(_) => ErrorKind::Configuration,
            Self::Io(_) | Self::Csv(_) => ErrorKind::Io,
        }
    }

    /// The stage that failed, if the error was raised while processing a sample
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Sample { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub(crate) fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical(message.into())
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn input_shape(message: impl Into<String>) -> Self {
        Self::InputShape(message.into())
    }
}

/// Attach the sample name and failing stage to an error
pub(crate) trait AtStage<T> {
    fn at_stage(self, sample: &str, stage: Stage) -> crate::Result<T>;
}

impl<T> AtStage<T> for crate::Result<T> {
    fn at_stage(self, sample: &str, stage: Stage) -> crate::Result<T> {
        self.map_err(|source| Error::Sample {
            sample: sample.to_owned(),
            stage,
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AtStage, Error, ErrorKind, Stage};

    #[test]
    fn sample_errors_report_the_root_kind_and_stage() {
        let result: crate::Result<()> = Err(Error::numerical("singular hessian"));
        let err = result.at_stage("zircon-01", Stage::Covariance).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Numerical);
        assert_eq!(err.stage(), Some(Stage::Covariance));

        let message = err.to_string();
        assert!(message.contains("zircon-01"));
        assert!(message.contains("covariance estimation"));
        assert!(message.contains("singular hessian"));
    }
}
