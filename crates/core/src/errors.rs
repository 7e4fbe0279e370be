use thiserror::Error;

use crate::signals::SignalStoreError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {field} value `{value}`")]
    InvalidValue { field: &'static str, value: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures surfaced by the recommendation and assistant operations.
///
/// `Clone` because a single cache computation hands its outcome to every
/// waiter of the same key.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{kind} `{id}` was not found")]
    NotFound { kind: &'static str, id: String },
    #[error("signal data unavailable: {0}")]
    DataUnavailable(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("cache failure: {0}")]
    Cache(String),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }

    /// Whether a retry of the same request may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DataUnavailable(_) | Self::Cache(_))
    }
}

impl From<SignalStoreError> for EngineError {
    fn from(value: SignalStoreError) -> Self {
        Self::DataUnavailable(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested item does not exist.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl EngineError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<EngineError> for InterfaceError {
    fn from(value: EngineError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            EngineError::InvalidQuery(message) => Self::BadRequest { message, correlation_id },
            error @ EngineError::NotFound { .. } => {
                Self::NotFound { message: error.to_string(), correlation_id }
            }
            EngineError::DataUnavailable(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            EngineError::Cache(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{EngineError, InterfaceError};
    use crate::signals::SignalStoreError;

    #[test]
    fn invalid_query_maps_to_bad_request_interface_error() {
        let interface = EngineError::InvalidQuery("min_price exceeds max_price".to_owned())
            .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn not_found_keeps_kind_and_id_in_message() {
        let interface = EngineError::not_found("product", 42).into_interface("req-2");

        assert!(matches!(
            interface,
            InterfaceError::NotFound { ref message, .. } if message == "product `42` was not found"
        ));
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn signal_store_failure_is_recoverable_and_maps_to_service_unavailable() {
        let engine = EngineError::from(SignalStoreError::Unavailable("pool timed out".to_owned()));
        assert!(engine.is_recoverable());

        let interface = engine.into_interface("req-3");
        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn cache_error_maps_to_internal() {
        let interface =
            EngineError::Cache("payload did not deserialize".to_owned()).into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
