//! flux-store: an immutable, unidirectional state container
//!
//! ```text
//! dispatch(action) → Middleware Chain → Reducer → commit → Subscribers
//! ```
//!
//! - [`Store`] owns the current state (`Arc<S>`), serializes transitions and
//!   hands out subscriptions.
//! - [`Middleware`] wraps dispatch: logging, async follow-ups, filtering.
//! - [`Mutation`] composes nested reducers while keeping unchanged subtrees
//!   reference-identical.
//! - [`Subscription`]s observe a selected slice and fire only when it changes.
//!
//! # Example
//!
//! ```ignore
//! let store = flux_store::create_store(reduce, AppState::default(), vec![
//!     Box::new(LoggingMiddleware::new()),
//! ]);
//! let _sub = store.subscribe(|s: &AppState| s.counter.value, |value| {
//!     log::info!("counter is now {}", value);
//!     Ok(())
//! });
//! store.dispatch(Action::Increment(2))?;
//! ```

pub mod error;
pub mod middleware;
pub mod reducer;
pub mod store;
pub mod subscription;

pub use error::{FailureStage, StoreError, SubscriberFailure, SubscriberFailures};
pub use flux_config::{StoreConfig, SubscriberErrorPolicy};
pub use middleware::logging::LoggingMiddleware;
pub use middleware::snapshot::{Snapshot, SnapshotLog, SnapshotMiddleware};
pub use middleware::{from_fn, FnMiddleware, Middleware, Next};
pub use reducer::{infallible, Mutation, Reducer};
pub use store::{create_store, Store, StoreBuilder};
pub use subscription::{same_ref, Subscription, SubscriptionId, Unsubscribe};
