use thiserror::Error;

/// Typed error hierarchy for the router.
///
/// Use at module boundaries (model-client calls, plan validation, execution,
/// summarization). Internal/leaf functions can continue using `anyhow::Result`
/// — the `Internal` variant allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("plan response could not be parsed: {reason}")]
    PlanParse { reason: String, raw: Option<String> },

    #[error("model truncated its plan response")]
    PlanTruncated,

    #[error("plan rejected: {reason}")]
    PlanRejected {
        reason: String,
        step_name: Option<String>,
    },

    #[error("tool call failed: {0}")]
    StepError(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("upstream tool server unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("model endpoint unavailable: {0}")]
    ModelUnavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RouterError {
    /// The router-level phase a caller-visible error failed in, per the
    /// error envelope contract in spec §7 ("message names the failing phase").
    pub fn phase(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "validate",
            Self::PlanParse { .. } | Self::PlanTruncated | Self::ModelUnavailable(_) => "plan",
            Self::PlanRejected { .. } => "validate",
            Self::StepError(_) | Self::UpstreamUnavailable(_) => "execute",
            Self::DeadlineExceeded => "execute",
            Self::Internal(_) => "internal",
        }
    }
}
