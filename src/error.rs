use thiserror::Error;

/// Failure of a single call to the text-generation endpoint.
///
/// These never reach callers directly; once the attempt budget is spent the
/// last one is summarized into [`AdviceGenerationError::Api`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Upstream returned no usable text: {0}")]
    EmptyResponse(String),

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdviceGenerationError {
    #[error("Insufficient data: at least {min_months_required} months are required, {available} available")]
    InsufficientData {
        min_months_required: usize,
        available: usize,
    },

    #[error("Advice API failed after {attempts} attempts: {last_error}")]
    Api {
        attempts: u32,
        last_error: TransportError,
    },

    #[error("Could not parse advice response: {reason}")]
    Parse { raw_response: String, reason: String },
}

impl AdviceGenerationError {
    /// Only upstream failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdviceGenerationError::Api { .. })
    }

    pub fn retry_count(&self) -> Option<u32> {
        match self {
            AdviceGenerationError::Api { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AdviceGenerationError::Parse { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Advice cannot be generated for {year}-{month:02}: {reason}")]
    MonthNotEligible { year: i32, month: u32, reason: String },

    #[error(transparent)]
    Generation(#[from] AdviceGenerationError),

    #[error("Month data provider error: {0}")]
    DataProvider(String),

    #[error("Advice store error: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AdvisorError {
    /// Text suitable for showing to the person who asked for advice.
    pub fn user_message(&self) -> String {
        match self {
            AdvisorError::MonthNotEligible { reason, .. } => {
                format!("Advice is not available for this month: {}.", reason)
            }
            AdvisorError::Generation(AdviceGenerationError::InsufficientData {
                min_months_required,
                ..
            }) => format!(
                "At least {} months of data are needed before advice can be generated.",
                min_months_required
            ),
            AdvisorError::Generation(AdviceGenerationError::Api { attempts, .. }) => format!(
                "The advice service is unavailable right now (tried {} times). Please try again later.",
                attempts
            ),
            AdvisorError::Generation(AdviceGenerationError::Parse { .. }) => {
                "The advice service returned an unexpected answer. Please regenerate.".to_string()
            }
            AdvisorError::DataProvider(_)
            | AdvisorError::Store(_)
            | AdvisorError::Config(_)
            | AdvisorError::SerializationError(_) => {
                "Something went wrong while preparing your advice.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
