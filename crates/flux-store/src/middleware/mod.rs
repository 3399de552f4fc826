//! Middleware system
//!
//! Middleware wraps the dispatch pipeline. The first middleware in the list
//! is the outermost one: it sees every action first and decides what to do
//! with it.
//!
//! ```text
//! dispatch(action) → M1 → M2 → … → reducer → commit → notify subscribers
//!                    ↑                                        │
//!                    └────────────── returns ─────────────────┘
//! ```
//!
//! Each middleware can:
//! - Inspect the action and read the current state via `store.get_state()`
//! - Pass the action on with `next.run(action)`, possibly transformed
//! - Short-circuit by never calling `next`
//! - Fan out by calling `next` several times
//! - Dispatch follow-up actions through `store.dispatch` (queued while the
//!   current dispatch is in flight, or later from another thread)

use crate::error::StoreError;
use crate::store::Store;

pub mod logging;
pub mod snapshot;

/// Middleware trait - intercepts actions on their way to the reducer
///
/// Middleware lives as long as the store and only ever runs under the
/// store's writer lock, so `&mut self` is never contended.
pub trait Middleware<S, A>: Send {
    /// Name used in error reports and logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handle an action
    ///
    /// - `store`: read state or dispatch independent follow-up actions
    /// - `action`: the action travelling down the chain
    /// - `next`: the rest of the chain, ending at the reducer
    fn handle(&mut self, store: &Store<S, A>, action: A, next: Next<'_, S, A>)
        -> Result<(), StoreError>;
}

/// Base dispatch at the end of the chain: reduce, commit, notify
pub(crate) type BaseDispatch<'a, A> = dyn Fn(A) -> Result<(), StoreError> + 'a;

/// The remainder of the middleware chain
pub struct Next<'a, S, A> {
    store: &'a Store<S, A>,
    chain: &'a mut [Box<dyn Middleware<S, A>>],
    base: &'a BaseDispatch<'a, A>,
}

impl<S, A> Next<'_, S, A> {
    /// Pass an action to the next middleware, or to the reducer if this is
    /// the innermost one. May be called any number of times.
    pub fn run(&mut self, action: A) -> Result<(), StoreError> {
        run_chain(self.store, self.chain, self.base, action)
    }
}

pub(crate) fn run_chain<S, A>(
    store: &Store<S, A>,
    chain: &mut [Box<dyn Middleware<S, A>>],
    base: &BaseDispatch<'_, A>,
    action: A,
) -> Result<(), StoreError> {
    match chain.split_first_mut() {
        Some((head, rest)) => head.handle(
            store,
            action,
            Next {
                store,
                chain: rest,
                base,
            },
        ),
        None => base(action),
    }
}

/// Middleware built from a closure
pub struct FnMiddleware<F> {
    name: String,
    handler: F,
}

/// Wrap a closure as a middleware
///
/// # Example
///
/// ```ignore
/// let auth = middleware::from_fn("auth", |store, action, mut next| {
///     if store.get_state().session.is_some() {
///         next.run(action)
///     } else {
///         Ok(()) // swallow actions while logged out
///     }
/// });
/// ```
pub fn from_fn<S, A, F>(name: impl Into<String>, handler: F) -> FnMiddleware<F>
where
    F: FnMut(&Store<S, A>, A, Next<'_, S, A>) -> Result<(), StoreError> + Send,
{
    FnMiddleware {
        name: name.into(),
        handler,
    }
}

impl<S, A, F> Middleware<S, A> for FnMiddleware<F>
where
    F: FnMut(&Store<S, A>, A, Next<'_, S, A>) -> Result<(), StoreError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(
        &mut self,
        store: &Store<S, A>,
        action: A,
        next: Next<'_, S, A>,
    ) -> Result<(), StoreError> {
        (self.handler)(store, action, next)
    }
}
