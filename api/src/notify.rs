//! Classification of API failures into user-facing notices.
//!
//! Raw [`ApiError`] events carry a status code and a server detail; this
//! module turns them into [`ErrorNotice`]s with a stable category, title,
//! and severity, published on their own bus for whatever surface renders
//! them (toasts, a status line, a log).

use std::fmt;

use tokio::task::JoinHandle;
use tracing::debug;
use wallflower_core::event_bus::EventBus;

use crate::service::{ApiError, RetryFn};

/// Detail message published when a retry attempt fails again.
pub const RETRY_FAILED: &str = "Retry attempt failed";

/// Broad category assigned to an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The session is missing, expired, or rejected (401).
    Authentication,
    /// The session is valid but not allowed here (403).
    AccessDenied,
    /// The entity does not exist (404).
    NotFound,
    /// The payload was rejected (422).
    Validation,
    /// The backend or a dependency of it failed (500).
    Internal,
    /// Any other non-success status.
    Api,
}

impl ErrorKind {
    /// Classify an HTTP status code.
    #[must_use]
    pub const fn classify(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::AccessDenied,
            404 => Self::NotFound,
            422 => Self::Validation,
            500 => Self::Internal,
            _ => Self::Api,
        }
    }

    /// Display title for this category.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::AccessDenied => "Access denied",
            Self::NotFound => "Entity not found",
            Self::Validation => "Validation error",
            Self::Internal => "Internal service error",
            Self::Api => "API error",
        }
    }
}

/// Presentation weight of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    /// Something failed; the default for classified API errors.
    #[default]
    Error,
    /// Something degraded but the flow continued.
    Warning,
    /// Informational only.
    Info,
}

/// User-facing error descriptor published on the notice bus.
#[derive(Clone)]
pub struct ErrorNotice {
    /// Category derived from the status code.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
    /// Presentation weight.
    pub severity: Severity,
    /// Replays the failed request, when the original call allowed it.
    pub retry: Option<RetryFn>,
}

impl ErrorNotice {
    /// Classify a raw API error into a notice.
    #[must_use]
    pub fn from_api(error: &ApiError) -> Self {
        Self {
            kind: ErrorKind::classify(error.status),
            message: error.details.clone(),
            severity: Severity::Error,
            retry: error.retry.clone(),
        }
    }

    /// Display title for this notice's category.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// Whether this notice carries a retry handle.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        self.retry.is_some()
    }
}

impl fmt::Debug for ErrorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorNotice")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("severity", &self.severity)
            .field("retryable", &self.retry.is_some())
            .finish()
    }
}

/// Bridges the raw API error bus onto the user-facing notice bus.
#[derive(Debug, Clone)]
pub struct Notifier {
    notices: EventBus<ErrorNotice>,
}

impl Notifier {
    /// Create a notifier publishing onto `notices`.
    #[must_use]
    pub const fn new(notices: EventBus<ErrorNotice>) -> Self {
        Self { notices }
    }

    /// The bus classified notices are published on.
    #[must_use]
    pub const fn notices(&self) -> &EventBus<ErrorNotice> {
        &self.notices
    }

    /// Classify one error and publish the resulting notice.
    ///
    /// Returns the number of subscribers the notice reached.
    pub fn notify(&self, error: &ApiError) -> usize {
        let notice = ErrorNotice::from_api(error);
        debug!(kind = ?notice.kind, status = error.status, "classified API error");
        self.notices.publish(notice)
    }

    /// Spawn a task forwarding every error from `errors` as a notice.
    ///
    /// The task ends when the error bus is dropped. The handle can be
    /// used to abort forwarding early.
    #[must_use]
    pub fn bridge(&self, errors: &EventBus<ApiError>) -> JoinHandle<()> {
        let mut subscription = errors.subscribe();
        let notifier = self.clone();
        tokio::spawn(async move {
            while let Some(error) = subscription.next().await {
                notifier.notify(&error);
            }
        })
    }

    /// Replay the request behind a notice.
    ///
    /// Resolves to `true` when the replay succeeds. A notice without a
    /// retry handle resolves to `false` immediately; a replay that fails
    /// again additionally publishes a non-retryable internal notice.
    pub async fn retry(&self, notice: &ErrorNotice) -> bool {
        let Some(retry) = notice.retry.clone() else {
            return false;
        };

        if retry().await {
            return true;
        }

        self.notices.publish(ErrorNotice {
            kind: ErrorKind::Internal,
            message: RETRY_FAILED.to_owned(),
            severity: Severity::Error,
            retry: None,
        });
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Arc;

    #[test]
    fn statuses_map_to_their_categories() {
        assert_eq!(ErrorKind::classify(401), ErrorKind::Authentication);
        assert_eq!(ErrorKind::classify(403), ErrorKind::AccessDenied);
        assert_eq!(ErrorKind::classify(404), ErrorKind::NotFound);
        assert_eq!(ErrorKind::classify(422), ErrorKind::Validation);
        assert_eq!(ErrorKind::classify(500), ErrorKind::Internal);
        assert_eq!(ErrorKind::classify(418), ErrorKind::Api);
        assert_eq!(ErrorKind::classify(503), ErrorKind::Api);
    }

    #[test]
    fn titles_follow_the_category() {
        assert_eq!(ErrorKind::Authentication.title(), "Authentication error");
        assert_eq!(ErrorKind::AccessDenied.title(), "Access denied");
        assert_eq!(ErrorKind::NotFound.title(), "Entity not found");
        assert_eq!(ErrorKind::Validation.title(), "Validation error");
        assert_eq!(ErrorKind::Internal.title(), "Internal service error");
        assert_eq!(ErrorKind::Api.title(), "API error");
    }

    #[test]
    fn notices_inherit_detail_and_retry_handle() {
        let error = ApiError::new(404, "no such project");
        let notice = ErrorNotice::from_api(&error);

        assert_eq!(notice.kind, ErrorKind::NotFound);
        assert_eq!(notice.message, "no such project");
        assert_eq!(notice.severity, Severity::Error);
        assert!(!notice.can_retry());
        assert_eq!(notice.title(), "Entity not found");
    }

    #[tokio::test]
    async fn bridge_forwards_errors_as_notices() {
        let errors: EventBus<ApiError> = EventBus::new();
        let notifier = Notifier::new(EventBus::new());
        let mut notices = notifier.notices().subscribe();

        let bridge = notifier.bridge(&errors);
        errors.publish(ApiError::new(422, "name is required"));

        let notice = notices.next().await.unwrap();
        assert_eq!(notice.kind, ErrorKind::Validation);
        assert_eq!(notice.message, "name is required");

        bridge.abort();
    }

    #[tokio::test]
    async fn retry_without_handle_resolves_false() {
        let notifier = Notifier::new(EventBus::new());
        let notice = ErrorNotice::from_api(&ApiError::new(500, "boom"));

        assert!(!notifier.retry(&notice).await);
    }

    #[tokio::test]
    async fn failed_retry_publishes_a_non_retryable_notice() {
        let notifier = Notifier::new(EventBus::new());
        let mut notices = notifier.notices().subscribe();

        let notice = ErrorNotice {
            kind: ErrorKind::Internal,
            message: "first failure".to_owned(),
            severity: Severity::Error,
            retry: Some(Arc::new(|| async { false }.boxed())),
        };

        assert!(!notifier.retry(&notice).await);

        let followup = notices.next().await.unwrap();
        assert_eq!(followup.kind, ErrorKind::Internal);
        assert_eq!(followup.message, RETRY_FAILED);
        assert!(!followup.can_retry());
    }

    #[tokio::test]
    async fn successful_retry_publishes_nothing() {
        let notifier = Notifier::new(EventBus::new());
        let mut notices = notifier.notices().subscribe();

        let notice = ErrorNotice {
            kind: ErrorKind::Api,
            message: "flaky".to_owned(),
            severity: Severity::Error,
            retry: Some(Arc::new(|| async { true }.boxed())),
        };

        assert!(notifier.retry(&notice).await);
        assert!(notices.try_next().is_none());
    }
}
