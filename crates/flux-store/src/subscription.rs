//! Selector-based subscriptions and the post-commit notification sweep
//!
//! A subscription pairs a selector (`&S -> T`) with an equality policy and a
//! callback. After every committed transition the registry recomputes each
//! selector and calls back only those whose selected value changed.
//!
//! Selectors, equality checks and callbacks run in isolation: an `Err` or a
//! panic in one subscription is captured as a [`SubscriberFailure`] and the
//! sweep moves on to the next one.

use crate::error::{FailureStage, SubscriberFailure};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Identifier of a subscription, unique per store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference equality for `Arc` slices, for use with `subscribe_with`
pub fn same_ref<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::ptr_eq(a, b)
}

type ObserveResult = Result<(), (FailureStage, anyhow::Error)>;

/// Type-erased view of a subscription, as seen by the sweep
trait Observer<S>: Send {
    fn observe(&mut self, state: &S) -> ObserveResult;
}

pub(crate) struct Selection<T, Sel, Eq, Cb> {
    selector: Sel,
    equality: Eq,
    callback: Cb,
    last_value: Option<T>,
}

impl<T, Sel, Eq, Cb> Selection<T, Sel, Eq, Cb> {
    pub(crate) fn new(selector: Sel, equality: Eq, callback: Cb) -> Self {
        Self {
            selector,
            equality,
            callback,
            last_value: None,
        }
    }

    /// Record the currently selected value, optionally delivering it
    pub(crate) fn seed<S>(&mut self, state: &S, emit: bool) -> ObserveResult
    where
        Sel: Fn(&S) -> T,
        Cb: FnMut(&T) -> anyhow::Result<()>,
    {
        let value = guarded(|| (self.selector)(state)).map_err(|e| (FailureStage::Selector, e))?;
        let value: &T = self.last_value.insert(value);
        if emit {
            guarded(|| (self.callback)(value))
                .and_then(|result| result)
                .map_err(|e| (FailureStage::Callback, e))?;
        }
        Ok(())
    }
}

impl<S, T, Sel, Eq, Cb> Observer<S> for Selection<T, Sel, Eq, Cb>
where
    T: Send,
    Sel: Fn(&S) -> T + Send,
    Eq: Fn(&T, &T) -> bool + Send,
    Cb: FnMut(&T) -> anyhow::Result<()> + Send,
{
    fn observe(&mut self, state: &S) -> ObserveResult {
        let value = guarded(|| (self.selector)(state)).map_err(|e| (FailureStage::Selector, e))?;

        if let Some(last) = &self.last_value {
            let unchanged = guarded(|| (self.equality)(last, &value))
                .map_err(|e| (FailureStage::Equality, e))?;
            if unchanged {
                return Ok(());
            }
        }

        let value: &T = self.last_value.insert(value);
        guarded(|| (self.callback)(value))
            .and_then(|result| result)
            .map_err(|e| (FailureStage::Callback, e))
    }
}

/// Run user code, turning a panic into an error
fn guarded<R>(f: impl FnOnce() -> R) -> anyhow::Result<R> {
    catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| anyhow::anyhow!("panicked: {}", panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

struct Entry<S> {
    id: SubscriptionId,
    active: Arc<AtomicBool>,
    observer: Mutex<Box<dyn Observer<S>>>,
}

struct RegistryShared<S> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Arc<Entry<S>>>>,
}

/// Removal side of the registry, erased over the state type
trait Unregister: Send + Sync {
    fn unregister(&self, id: SubscriptionId);
}

impl<S> Unregister for RegistryShared<S> {
    fn unregister(&self, id: SubscriptionId) {
        self.entries.lock().retain(|entry| entry.id != id);
    }
}

/// Registry of live subscriptions
pub(crate) struct SubscriptionRegistry<S> {
    shared: Arc<RegistryShared<S>>,
}

impl<S: 'static> SubscriptionRegistry<S> {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                next_id: AtomicU64::new(1),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn next_id(&self) -> SubscriptionId {
        SubscriptionId::from_raw(self.shared.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn register<T, Sel, Eq, Cb>(
        &self,
        id: SubscriptionId,
        selection: Selection<T, Sel, Eq, Cb>,
    ) -> Subscription
    where
        T: Send + 'static,
        Sel: Fn(&S) -> T + Send + 'static,
        Eq: Fn(&T, &T) -> bool + Send + 'static,
        Cb: FnMut(&T) -> anyhow::Result<()> + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let observer: Box<dyn Observer<S>> = Box::new(selection);
        self.shared.entries.lock().push(Arc::new(Entry {
            id,
            active: Arc::clone(&active),
            observer: Mutex::new(observer),
        }));
        log::debug!("Subscription {} registered", id);

        let registry: Weak<dyn Unregister> = Arc::downgrade(&self.shared) as Weak<dyn Unregister>;
        Subscription {
            token: Unsubscribe {
                id,
                active,
                registry,
            },
            detached: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    /// Notify every live subscription whose selected value changed
    ///
    /// Iterates a snapshot of the entry list, so callbacks may subscribe or
    /// unsubscribe freely. Entries deactivated before their turn are skipped.
    pub(crate) fn notify(&self, state: &S) -> Vec<SubscriberFailure> {
        let entries: Vec<Arc<Entry<S>>> = self.shared.entries.lock().clone();
        let mut failures = Vec::new();

        for entry in entries {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            let mut observer = entry.observer.lock();
            if let Err((stage, error)) = observer.observe(state) {
                log::debug!("Subscription {} failed in {}: {}", entry.id, stage, error);
                failures.push(SubscriberFailure {
                    subscription: entry.id,
                    stage,
                    error,
                });
            }
        }

        failures
    }
}

/// Cloneable, idempotent unsubscribe token
///
/// Safe to call from inside any callback, including the subscription's own.
#[derive(Clone)]
pub struct Unsubscribe {
    id: SubscriptionId,
    active: Arc<AtomicBool>,
    registry: Weak<dyn Unregister>,
}

impl Unsubscribe {
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            if let Some(registry) = self.registry.upgrade() {
                registry.unregister(self.id);
            }
            log::debug!("Subscription {} removed", self.id);
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Handle to a registered subscription
///
/// Dropping the handle unsubscribes. Call [`Subscription::detach`] to keep
/// the subscription alive for as long as the store lives.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
#[derive(Debug)]
pub struct Subscription {
    token: Unsubscribe,
    detached: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.token.id
    }

    pub fn is_active(&self) -> bool {
        self.token.is_active()
    }

    /// Remove the subscription. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        self.token.unsubscribe();
    }

    /// A token that can unsubscribe from elsewhere, e.g. the callback itself
    pub fn unsubscriber(&self) -> Unsubscribe {
        self.token.clone()
    }

    /// Stop tying the subscription to this handle's lifetime
    pub fn detach(mut self) -> Unsubscribe {
        self.detached = true;
        self.token.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.token.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Counter {
        value: i32,
        label: &'static str,
    }

    fn registry() -> SubscriptionRegistry<Counter> {
        SubscriptionRegistry::new()
    }

    fn subscribe_recorder(
        registry: &SubscriptionRegistry<Counter>,
        state: &Counter,
        seen: Arc<Mutex<Vec<i32>>>,
    ) -> Subscription {
        let mut selection = Selection::new(
            |c: &Counter| c.value,
            |a: &i32, b: &i32| a == b,
            move |value: &i32| {
                seen.lock().push(*value);
                Ok(())
            },
        );
        selection.seed(state, false).unwrap();
        registry.register(registry.next_id(), selection)
    }

    #[test]
    fn test_notify_only_on_selected_change() {
        let registry = registry();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = subscribe_recorder(
            &registry,
            &Counter { value: 0, label: "a" },
            Arc::clone(&seen),
        );

        registry.notify(&Counter { value: 0, label: "b" });
        registry.notify(&Counter { value: 1, label: "b" });
        registry.notify(&Counter { value: 1, label: "c" });

        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn test_drop_unsubscribes_and_detach_keeps() {
        let registry = registry();
        let state = Counter { value: 0, label: "a" };
        let seen = Arc::new(Mutex::new(Vec::new()));

        let dropped = subscribe_recorder(&registry, &state, Arc::clone(&seen));
        let kept = subscribe_recorder(&registry, &state, Arc::clone(&seen)).detach();
        assert_eq!(registry.len(), 2);

        drop(dropped);
        assert_eq!(registry.len(), 1);
        assert!(kept.is_active());

        kept.unsubscribe();
        kept.unsubscribe();
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_panicking_callback_is_captured() {
        let registry = registry();
        let mut selection = Selection::new(
            |c: &Counter| c.label,
            |a: &&str, b: &&str| a == b,
            |_: &&str| -> anyhow::Result<()> { panic!("label rejected") },
        );
        selection
            .seed(&Counter { value: 0, label: "a" }, false)
            .unwrap();
        let sub = registry.register(registry.next_id(), selection);

        let failures = registry.notify(&Counter { value: 0, label: "b" });

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].subscription, sub.id());
        assert_eq!(failures[0].stage, FailureStage::Callback);
        assert!(failures[0].error.to_string().contains("label rejected"));
    }

    #[test]
    fn test_failing_selector_reports_stage() {
        let registry = registry();
        let mut selection = Selection::new(
            |c: &Counter| {
                assert!(c.value < 10, "value out of range");
                c.value
            },
            |a: &i32, b: &i32| a == b,
            |_: &i32| Ok(()),
        );
        selection
            .seed(&Counter { value: 0, label: "a" }, false)
            .unwrap();
        let _sub = registry.register(registry.next_id(), selection);

        let failures = registry.notify(&Counter {
            value: 11,
            label: "a",
        });

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].stage, FailureStage::Selector);
    }

    #[test]
    fn test_seed_with_emit_delivers_current_value() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut selection = Selection::new(
            |c: &Counter| c.value,
            |a: &i32, b: &i32| a == b,
            move |value: &i32| {
                sink.lock().push(*value);
                Ok(())
            },
        );

        selection
            .seed(&Counter { value: 4, label: "a" }, true)
            .unwrap();

        assert_eq!(*seen.lock(), vec![4]);
    }
}
