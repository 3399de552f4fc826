use crate::error::StoreError;
use crate::middleware::{Middleware, Next};
use crate::store::Store;
use std::fmt::Debug;
use std::sync::Arc;

type ActionFilter<A> = Box<dyn Fn(&A) -> bool + Send>;

/// LoggingMiddleware - logs every action along with the state before and after
///
/// Actions are logged at debug level, state snapshots at trace level.
pub struct LoggingMiddleware<A> {
    filter: Option<ActionFilter<A>>,
}

impl<A> LoggingMiddleware<A> {
    pub fn new() -> Self {
        Self { filter: None }
    }

    /// Only log actions for which `filter` returns true
    ///
    /// Useful to keep high-frequency actions (ticks, log lines) out of the log.
    pub fn with_filter(filter: impl Fn(&A) -> bool + Send + 'static) -> Self {
        Self {
            filter: Some(Box::new(filter)),
        }
    }

    fn should_log(&self, action: &A) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(action))
    }
}

impl<A> Default for LoggingMiddleware<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Debug, A: Debug> Middleware<S, A> for LoggingMiddleware<A> {
    fn name(&self) -> &str {
        "logging"
    }

    fn handle(
        &mut self,
        store: &Store<S, A>,
        action: A,
        mut next: Next<'_, S, A>,
    ) -> Result<(), StoreError> {
        if !self.should_log(&action) {
            return next.run(action);
        }

        let previous = store.get_state();
        let description = format!("{:?}", action);
        log::debug!("Action: {}", description);
        log::trace!("Previous state: {:?}", previous);

        if let Err(e) = next.run(action) {
            log::debug!("Action {} failed: {}", description, e);
            return Err(e);
        }

        let current = store.get_state();
        if Arc::ptr_eq(&previous, &current) {
            log::debug!("Action {} left state unchanged", description);
        } else {
            log::trace!("Next state: {:?}", current);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Tick {
        Frame,
        Add(u32),
    }

    fn reduce(total: &Arc<u32>, tick: &Tick) -> anyhow::Result<Arc<u32>> {
        Ok(match tick {
            Tick::Frame => Arc::clone(total),
            Tick::Add(n) => Arc::new(**total + n),
        })
    }

    #[test]
    fn test_filtered_actions_still_reach_reducer() {
        let store = Store::builder(reduce, 0u32)
            .middleware(LoggingMiddleware::with_filter(|tick: &Tick| {
                !matches!(tick, Tick::Frame)
            }))
            .build();

        store.dispatch(Tick::Frame).unwrap();
        store.dispatch(Tick::Add(3)).unwrap();

        assert_eq!(*store.get_state(), 3);
    }

    #[test]
    fn test_reducer_error_passes_through() {
        let failing = |_: &Arc<u32>, _: &Tick| -> anyhow::Result<Arc<u32>> {
            anyhow::bail!("broken reducer")
        };
        let store = Store::builder(failing, 0u32)
            .middleware(LoggingMiddleware::new())
            .build();

        let err = store.dispatch(Tick::Add(1)).unwrap_err();
        assert!(matches!(err, StoreError::Reducer(_)));
    }
}
