use crate::error::{StoreError, SubscriberFailure, SubscriberFailures};
use crate::middleware::{self, Middleware};
use crate::reducer::Reducer;
use crate::subscription::{Selection, Subscription, SubscriptionId, SubscriptionRegistry};
use arc_swap::ArcSwap;
use flux_config::{StoreConfig, SubscriberErrorPolicy};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::Arc;

type StateEquality<S> = Box<dyn Fn(&Arc<S>, &Arc<S>) -> bool + Send + Sync>;

/// Store - holds the state tree and runs the Redux loop
///
/// The Store follows the Redux pattern:
/// - A single authoritative, immutable state tree behind an `Arc`
/// - Actions are dispatched through a middleware chain to a pure reducer
/// - Committed transitions notify selector-based subscriptions
///
/// `Store` is a cheap handle: clones share the same state, middleware and
/// subscriptions. Pass it to whoever needs to dispatch or subscribe.
///
/// # Ordering
///
/// Transitions are serialized by a single writer lock; each one runs
/// "read previous state → reduce → commit → notify" to completion before the
/// next begins. A dispatch issued from inside the pipeline on the same thread
/// (by a middleware, reducer helper or subscriber) is queued and drained in
/// FIFO order before the outermost `dispatch` returns.
pub struct Store<S, A> {
    inner: Arc<Inner<S, A>>,
}

struct Inner<S, A> {
    state: ArcSwap<S>,
    writer: ReentrantMutex<Writer<S, A>>,
    registry: SubscriptionRegistry<S>,
    state_equality: StateEquality<S>,
    subscriber_errors: SubscriberErrorPolicy,
    initial_callback: bool,
}

/// Everything only touched while holding the writer lock
struct Writer<S, A> {
    dispatching: Cell<bool>,
    pending: RefCell<VecDeque<A>>,
    failures: RefCell<Vec<SubscriberFailure>>,
    middleware: RefCell<Vec<Box<dyn Middleware<S, A>>>>,
    reducer: Box<dyn Reducer<S, A>>,
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Create a store from a root reducer, initial state and middleware list
///
/// Middleware runs in list order: the first entry is the outermost.
pub fn create_store<S, A, R>(
    reducer: R,
    initial_state: impl Into<Arc<S>>,
    middleware: Vec<Box<dyn Middleware<S, A>>>,
) -> Store<S, A>
where
    S: 'static,
    R: Reducer<S, A> + 'static,
{
    middleware
        .into_iter()
        .fold(StoreBuilder::new(reducer, initial_state), |builder, m| {
            builder.boxed_middleware(m)
        })
        .build()
}

/// Builder for a [`Store`] with non-default options
pub struct StoreBuilder<S, A> {
    reducer: Box<dyn Reducer<S, A>>,
    initial_state: Arc<S>,
    middleware: Vec<Box<dyn Middleware<S, A>>>,
    state_equality: StateEquality<S>,
    subscriber_errors: SubscriberErrorPolicy,
    initial_callback: bool,
}

impl<S: 'static, A> StoreBuilder<S, A> {
    pub fn new<R>(reducer: R, initial_state: impl Into<Arc<S>>) -> Self
    where
        R: Reducer<S, A> + 'static,
    {
        Self {
            reducer: Box::new(reducer),
            initial_state: initial_state.into(),
            middleware: Vec::new(),
            state_equality: Box::new(|a: &Arc<S>, b: &Arc<S>| Arc::ptr_eq(a, b)),
            subscriber_errors: SubscriberErrorPolicy::default(),
            initial_callback: false,
        }
    }

    /// Append a middleware; earlier middleware wraps later middleware
    pub fn middleware<M: Middleware<S, A> + 'static>(self, middleware: M) -> Self {
        self.boxed_middleware(Box::new(middleware))
    }

    pub fn boxed_middleware(mut self, middleware: Box<dyn Middleware<S, A>>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Replace the "did the root change" test (reference equality by default)
    pub fn state_equality(
        mut self,
        equality: impl Fn(&Arc<S>, &Arc<S>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.state_equality = Box::new(equality);
        self
    }

    pub fn subscriber_errors(mut self, policy: SubscriberErrorPolicy) -> Self {
        self.subscriber_errors = policy;
        self
    }

    /// Deliver the current selected value to new subscriptions immediately
    ///
    /// Failures of that first call are logged at error level rather than
    /// handled by the [`SubscriberErrorPolicy`], since `subscribe` has no
    /// error to return.
    pub fn initial_callback(mut self, enabled: bool) -> Self {
        self.initial_callback = enabled;
        self
    }

    /// Apply the options from a loaded [`StoreConfig`]
    pub fn config(self, config: &StoreConfig) -> Self {
        self.subscriber_errors(config.subscriber_errors)
            .initial_callback(config.initial_callback)
    }

    pub fn build(self) -> Store<S, A> {
        log::debug!(
            "Creating store with {} middleware (subscriber errors: {:?}, initial callback: {})",
            self.middleware.len(),
            self.subscriber_errors,
            self.initial_callback
        );
        Store {
            inner: Arc::new(Inner {
                state: ArcSwap::new(self.initial_state),
                writer: ReentrantMutex::new(Writer {
                    dispatching: Cell::new(false),
                    pending: RefCell::new(VecDeque::new()),
                    failures: RefCell::new(Vec::new()),
                    middleware: RefCell::new(self.middleware),
                    reducer: self.reducer,
                }),
                registry: SubscriptionRegistry::new(),
                state_equality: self.state_equality,
                subscriber_errors: self.subscriber_errors,
                initial_callback: self.initial_callback,
            }),
        }
    }
}

impl<S, A> Store<S, A> {
    /// Get the current committed state
    ///
    /// Lock-free; never blocks on an in-flight dispatch.
    pub fn get_state(&self) -> Arc<S> {
        self.inner.state.load_full()
    }
}

impl<S: 'static, A: Clone> Store<S, A> {
    pub fn new<R>(reducer: R, initial_state: impl Into<Arc<S>>) -> Self
    where
        R: Reducer<S, A> + 'static,
    {
        StoreBuilder::new(reducer, initial_state).build()
    }

    pub fn builder<R>(reducer: R, initial_state: impl Into<Arc<S>>) -> StoreBuilder<S, A>
    where
        R: Reducer<S, A> + 'static,
    {
        StoreBuilder::new(reducer, initial_state)
    }

    /// Process an action through the middleware chain and reducer
    ///
    /// Returns the action on success. Reducer and middleware failures are
    /// returned as-is and leave the state at its last committed value.
    /// Subscriber failures are handled according to the store's
    /// [`SubscriberErrorPolicy`].
    ///
    /// Called from inside an in-flight dispatch on the same thread, the action
    /// is queued and `Ok(action)` is returned right away; the outermost call
    /// processes it once the current transition, sweep included, is complete.
    pub fn dispatch(&self, action: A) -> Result<A, StoreError> {
        let writer = self.inner.writer.lock();
        if writer.dispatching.get() {
            log::trace!("Dispatch in flight, queueing action");
            writer.pending.borrow_mut().push_back(action.clone());
            return Ok(action);
        }

        writer.dispatching.set(true);
        let writer = scopeguard::guard(writer, release);

        let result = self.run_transition(&writer, action.clone());
        let result = self.drain(&writer, result);
        let failures = std::mem::take(&mut *writer.failures.borrow_mut());
        self.settle(result.map(|()| action), failures)
    }

    /// Subscribe to a slice of state, compared with `PartialEq`
    ///
    /// The callback fires after each committed transition that changes the
    /// selected value. It does not fire on subscribe unless the store was
    /// built with `initial_callback(true)`.
    ///
    /// A failure of that initial call is logged and never returned, whatever
    /// the [`SubscriberErrorPolicy`].
    pub fn subscribe<T, Sel, Cb>(&self, selector: Sel, callback: Cb) -> Subscription
    where
        T: PartialEq + Send + 'static,
        Sel: Fn(&S) -> T + Send + 'static,
        Cb: FnMut(&T) -> anyhow::Result<()> + Send + 'static,
    {
        self.subscribe_with(selector, |a: &T, b: &T| a == b, callback)
    }

    /// Subscribe to a slice of state with a custom equality policy
    pub fn subscribe_with<T, Sel, Eq, Cb>(
        &self,
        selector: Sel,
        equality: Eq,
        callback: Cb,
    ) -> Subscription
    where
        T: Send + 'static,
        Sel: Fn(&S) -> T + Send + 'static,
        Eq: Fn(&T, &T) -> bool + Send + 'static,
        Cb: FnMut(&T) -> anyhow::Result<()> + Send + 'static,
    {
        // Seeding and registration must not interleave with a transition
        let writer = self.inner.writer.lock();
        let id = self.inner.registry.next_id();
        let mut selection = Selection::new(selector, equality, callback);

        if writer.dispatching.get() {
            // The in-flight dispatch drains whatever the initial callback queues
            self.seed(id, &mut selection);
            return self.inner.registry.register(id, selection);
        }

        // Dispatches from the initial callback are queued until the
        // subscription is registered, so it observes their commits
        writer.dispatching.set(true);
        let writer = scopeguard::guard(writer, release);
        self.seed(id, &mut selection);
        let subscription = self.inner.registry.register(id, selection);

        let result = self.drain(&writer, Ok(()));
        let failures = std::mem::take(&mut *writer.failures.borrow_mut());
        if let Err(e) = self.settle(result, failures) {
            log::error!("Dispatch from subscription {} on subscribe failed: {}", id, e);
        }
        subscription
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    fn seed<T, Sel, Eq, Cb>(
        &self,
        id: SubscriptionId,
        selection: &mut Selection<T, Sel, Eq, Cb>,
    ) where
        Sel: Fn(&S) -> T,
        Cb: FnMut(&T) -> anyhow::Result<()>,
    {
        if let Err((stage, e)) = selection.seed(&*self.get_state(), self.inner.initial_callback) {
            log::error!("Subscription {} failed in {} on subscribe: {}", id, stage, e);
        }
    }

    /// Run queued actions in FIFO order until the queue is empty or one fails
    fn drain(
        &self,
        writer: &Writer<S, A>,
        mut result: Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        while result.is_ok() {
            let queued = writer.pending.borrow_mut().pop_front();
            match queued {
                Some(queued) => result = self.run_transition(writer, queued),
                None => break,
            }
        }

        let dropped = writer.pending.borrow().len();
        if dropped > 0 {
            log::warn!("Dispatch failed, discarding {} queued action(s)", dropped);
        }
        result
    }

    fn run_transition(&self, writer: &Writer<S, A>, action: A) -> Result<(), StoreError> {
        let mut chain = writer.middleware.borrow_mut();
        let base = |action: A| self.reduce_and_commit(writer, action);
        middleware::run_chain(self, &mut chain, &base, action)
    }

    /// Base dispatch: run the root reducer, commit, notify subscribers
    fn reduce_and_commit(&self, writer: &Writer<S, A>, action: A) -> Result<(), StoreError> {
        let previous = self.get_state();
        let next = writer
            .reducer
            .reduce(&previous, &action)
            .map_err(StoreError::Reducer)?;

        if (self.inner.state_equality)(&previous, &next) {
            log::trace!("Reducer returned an equal state, nothing to commit");
            return Ok(());
        }

        self.inner.state.store(Arc::clone(&next));
        let failures = self.inner.registry.notify(&next);
        writer.failures.borrow_mut().extend(failures);
        Ok(())
    }

    fn settle<T>(
        &self,
        result: Result<T, StoreError>,
        failures: Vec<SubscriberFailure>,
    ) -> Result<T, StoreError> {
        match result {
            Ok(value) if failures.is_empty() => Ok(value),
            Ok(value) => match self.inner.subscriber_errors {
                SubscriberErrorPolicy::Return => {
                    Err(StoreError::Subscribers(SubscriberFailures::from(failures)))
                }
                SubscriberErrorPolicy::Log => {
                    for failure in &failures {
                        log::error!("{}", failure);
                    }
                    Ok(value)
                }
            },
            Err(e) => {
                for failure in &failures {
                    log::error!("{}", failure);
                }
                Err(e)
            }
        }
    }
}

/// Leave the in-flight state when the outermost dispatch ends, even by panic
fn release<S, A>(writer: ReentrantMutexGuard<'_, Writer<S, A>>) {
    writer.dispatching.set(false);
    writer.pending.borrow_mut().clear();
    writer.failures.borrow_mut().clear();
}
