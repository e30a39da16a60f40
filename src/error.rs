use std::sync::Arc;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by explorers and the [`MwtExplorer`](crate::MwtExplorer) dispatcher.
///
/// All variants are fatal for the call that produced them. A recorder refusing an interaction is
/// not an error; it is reported through [`LogStatus::Refused`](crate::LogStatus::Refused).
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// An explorer was configured (or a context reported) zero actions.
    #[error("{component}: number of actions must be positive")]
    InvalidNumberOfActions {
        /// Component that supplied the count.
        component: &'static str,
    },

    /// A strategy parameter is outside of its domain.
    #[error("{component}: invalid {parameter} ({reason})")]
    InvalidParameter {
        /// Component being constructed.
        component: &'static str,
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// A policy (or the explorer on its behalf) produced an action outside `[1, num_actions]`.
    #[error("{component}: action {action} is outside of the valid range [1, {num_actions}]")]
    ActionOutOfRange {
        /// Component whose output was rejected.
        component: &'static str,
        /// The rejected action.
        action: u32,
        /// Number of actions available for the decision.
        num_actions: u32,
    },

    /// A ranking is not a permutation of `1..=num_actions`.
    #[error("{component}: malformed ranking ({defect})")]
    MalformedRanking {
        /// Component whose output was rejected.
        component: &'static str,
        /// What is wrong with the ranking.
        defect: RankingDefect,
    },

    /// A scorer returned a different number of scores than there are actions.
    #[error("{component}: expected {expected} scores, got {found}")]
    ScoreCountMismatch {
        /// Scorer-consuming explorer.
        component: &'static str,
        /// Number of actions for the decision.
        expected: u32,
        /// Number of scores returned.
        found: usize,
    },

    /// Scores cannot be turned into a probability distribution (NaN, negative weights, or all
    /// weights zero).
    #[error("{component}: scores do not form a valid distribution ({reason})")]
    InvalidScores {
        /// Scorer-consuming explorer.
        component: &'static str,
        /// What is wrong with the scores.
        reason: &'static str,
    },

    /// The active explorer does not consume a swappable policy.
    #[error("{component} does not support updating its policy")]
    PolicyUpdateNotSupported {
        /// Explorer that refused the update.
        component: &'static str,
    },

    /// A new model could not be loaded from the provided stream. The previous model stays
    /// active.
    #[error("failed to load model: {0}")]
    ModelLoad(Arc<dyn std::error::Error + Send + Sync>),

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),
}

/// Defect found while validating a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingDefect {
    /// Ranking length differs from the number of actions.
    Length {
        /// Number of actions for the decision.
        expected: u32,
        /// Length of the ranking.
        found: usize,
    },
    /// An action appears more than once.
    Duplicate(u32),
}

impl std::fmt::Display for RankingDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankingDefect::Length { expected, found } => {
                write!(f, "expected {expected} actions, got {found}")
            }
            RankingDefect::Duplicate(action) => write!(f, "action {action} appears twice"),
        }
    }
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raised at construction: bad parameters or action counts.
    Configuration,
    /// Raised at decision time: a policy or scorer broke its contract.
    InvariantViolation,
    /// The requested operation is not supported by the active explorer.
    Unsupported,
    /// Loading a new model failed.
    ModelUpdate,
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidNumberOfActions { .. } | Error::InvalidParameter { .. } => {
                ErrorKind::Configuration
            }

            Error::ActionOutOfRange { .. }
            | Error::MalformedRanking { .. }
            | Error::ScoreCountMismatch { .. }
            | Error::InvalidScores { .. } => ErrorKind::InvariantViolation,

            Error::PolicyUpdateNotSupported { .. } => ErrorKind::Unsupported,

            Error::ModelLoad(_) | Error::Io(_) => ErrorKind::ModelUpdate,
        }
    }

    /// Wrap an arbitrary loader error.
    pub fn model_load(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::ModelLoad(Arc::new(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, RankingDefect};

    #[test]
    fn messages_name_component_and_input() {
        let err = Error::ActionOutOfRange {
            component: "EpsilonGreedyExplorer",
            action: 11,
            num_actions: 10,
        };
        assert_eq!(
            err.to_string(),
            "EpsilonGreedyExplorer: action 11 is outside of the valid range [1, 10]"
        );
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);

        let err = Error::MalformedRanking {
            component: "TopSlotExplorer",
            defect: RankingDefect::Duplicate(3),
        };
        assert_eq!(
            err.to_string(),
            "TopSlotExplorer: malformed ranking (action 3 appears twice)"
        );
    }

    #[test]
    fn io_errors_are_model_update_errors() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof").into();
        assert_eq!(err.kind(), ErrorKind::ModelUpdate);
        // Error must stay clonable.
        let _ = err.clone();
    }
}
