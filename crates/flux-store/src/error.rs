//! Store error taxonomy

use crate::subscription::SubscriptionId;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by [`Store::dispatch`](crate::Store::dispatch).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The root reducer returned an error. State is unchanged and no
    /// subscriber was notified.
    #[error("reducer failed: {0}")]
    Reducer(#[source] anyhow::Error),

    /// A middleware reported a failure, before or after calling `next`.
    #[error("middleware `{name}` failed: {source}")]
    Middleware {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// One or more selectors/callbacks failed during the notification sweep.
    /// The transition itself was committed.
    #[error("{0}")]
    Subscribers(SubscriberFailures),
}

impl StoreError {
    /// Build a middleware failure from any error
    pub fn middleware(name: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Middleware {
            name: name.into(),
            source: source.into(),
        }
    }

    /// The collected subscriber failures, if this is a `Subscribers` error
    pub fn subscriber_failures(&self) -> Option<&SubscriberFailures> {
        match self {
            Self::Subscribers(failures) => Some(failures),
            _ => None,
        }
    }
}

/// Which part of a subscription failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Selector,
    Equality,
    Callback,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selector => write!(f, "selector"),
            Self::Equality => write!(f, "equality"),
            Self::Callback => write!(f, "callback"),
        }
    }
}

/// A single isolated failure of one subscription during a sweep
#[derive(Debug, Error)]
#[error("subscription {subscription} failed in {stage}: {error}")]
pub struct SubscriberFailure {
    pub subscription: SubscriptionId,
    pub stage: FailureStage,
    #[source]
    pub error: anyhow::Error,
}

/// All subscriber failures collected during one dispatch, in sweep order
#[derive(Debug, Default)]
pub struct SubscriberFailures(Vec<SubscriberFailure>);

impl SubscriberFailures {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubscriberFailure> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<SubscriberFailure> {
        self.0
    }
}

impl From<Vec<SubscriberFailure>> for SubscriberFailures {
    fn from(failures: Vec<SubscriberFailure>) -> Self {
        Self(failures)
    }
}

impl fmt::Display for SubscriberFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} subscriber(s) failed", self.0.len())?;
        for failure in &self.0 {
            write!(f, "; {}", failure)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_failures_display() {
        let failures = SubscriberFailures::from(vec![SubscriberFailure {
            subscription: SubscriptionId::from_raw(3),
            stage: FailureStage::Callback,
            error: anyhow::anyhow!("boom"),
        }]);
        assert_eq!(
            failures.to_string(),
            "1 subscriber(s) failed; subscription #3 failed in callback: boom"
        );
    }

    #[test]
    fn test_middleware_error_keeps_name() {
        let err = StoreError::middleware("auth", anyhow::anyhow!("denied"));
        assert_eq!(err.to_string(), "middleware `auth` failed: denied");
        assert!(err.subscriber_failures().is_none());
    }
}
