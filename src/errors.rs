use crate::lifecycle::LifecycleError;
use crate::models::{ClientId, CreditRequestId, CreditStatus};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed input shape (name, document, contact fields).
    Validation(String),
    /// Operation references a client that does not exist.
    InvalidClientReference(ClientId),
    /// Resource not found error.
    NotFound(String),
    /// Attempted transition out of a terminal credit request state.
    InvalidStateTransition {
        /// The request being transitioned.
        request_id: CreditRequestId,
        /// Current status of the request.
        from: CreditStatus,
        /// Requested target status.
        to: CreditStatus,
    },
    /// Store-level conflict (duplicate document, open requests on delete, repeated onboarding).
    Conflict(String),
    /// A resolution guard configured in the policy was not met.
    PolicyViolation(String),
    /// Error raised by the backing store.
    Storage(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

/// Transport-independent classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BadRequest,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::BadRequest => "bad_request",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::InvalidClientReference(id) => write!(f, "Client {} does not exist", id),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidStateTransition {
                request_id,
                from,
                to,
            } => write!(
                f,
                "Credit request {} cannot move from {} to {}",
                request_id, from, to
            ),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::PolicyViolation(msg) => write!(f, "Policy violation: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl AppError {
    /// Classifies the error so an inbound layer can map it to a transport status.
    ///
    /// `WithContext` delegates to the wrapped error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Validation(_) | AppError::PolicyViolation(_) => ErrorCategory::BadRequest,
            AppError::InvalidClientReference(_) | AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::InvalidStateTransition { .. } | AppError::Conflict(_) => {
                ErrorCategory::Conflict
            }
            AppError::Storage(_) => ErrorCategory::Internal,
            AppError::WithContext { source, .. } => source.category(),
        }
    }

    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Renders the client-facing error body.
    ///
    /// Internal failures are logged in full and reported with a generic message.
    pub fn to_json(&self) -> serde_json::Value {
        let category = self.category();
        let message = match category {
            ErrorCategory::Internal => {
                tracing::error!("Internal error: {}", self);
                "Internal server error".to_string()
            }
            _ => self.root().to_string(),
        };

        json!({
            "error": message,
            "kind": category.as_str(),
        })
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidStateTransition {
                request_id,
                from,
                to,
            } => AppError::InvalidStateTransition {
                request_id,
                from,
                to,
            },
            other => AppError::PolicyViolation(other.to_string()),
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            AppError::Validation("x".into()).category(),
            ErrorCategory::BadRequest
        );
        assert_eq!(
            AppError::InvalidClientReference(7).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            AppError::InvalidStateTransition {
                request_id: 1,
                from: CreditStatus::Approved,
                to: CreditStatus::Denied,
            }
            .category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            AppError::Storage("down".into()).category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_context_preserves_category_and_root() {
        let err: Result<(), AppError> = Err(AppError::InvalidClientReference(42));
        let err = err.context("loading client").unwrap_err();

        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.root(), &AppError::InvalidClientReference(42));
        assert_eq!(err.to_string(), "loading client: Client 42 does not exist");
    }

    #[test]
    fn test_to_json_hides_internal_details() {
        let body = AppError::Storage("connection refused".into()).to_json();
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["kind"], "internal");

        let body = AppError::Conflict("document already registered".into()).to_json();
        assert_eq!(body["error"], "Conflict: document already registered");
        assert_eq!(body["kind"], "conflict");
    }

    #[test]
    fn test_lifecycle_error_conversion() {
        let err: AppError = LifecycleError::InvalidStateTransition {
            request_id: 3,
            from: CreditStatus::Denied,
            to: CreditStatus::Approved,
        }
        .into();
        assert!(matches!(err, AppError::InvalidStateTransition { request_id: 3, .. }));

        let err: AppError = LifecycleError::MissingScore.into();
        assert_eq!(err.category(), ErrorCategory::BadRequest);
    }
}
