//! Profile loading middleware
//!
//! Turns `ProfileRequested` into a background job. The job runs off the
//! store's writer lock and reports back with `ProfileLoaded`/`ProfileFailed`
//! as an ordinary dispatch once it is done.

use crate::actions::{Action, UserAction};
use crate::state::AppState;
use flux_store::{Middleware, Next, Store, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Profile lookup table standing in for a remote directory service
pub type ProfileDirectory = Arc<HashMap<u64, String>>;

/// Handles of background jobs started by middleware
#[derive(Clone, Default)]
pub struct BackgroundJobs {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundJobs {
    fn track(&self, handle: JoinHandle<()>) {
        self.handles.lock().push(handle);
    }

    /// Block until every job started so far has finished
    pub fn wait(&self) {
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Background job panicked");
            }
        }
    }
}

/// ProfileMiddleware - loads user profiles in the background
pub struct ProfileMiddleware {
    directory: ProfileDirectory,
    latency: Duration,
    jobs: BackgroundJobs,
}

impl ProfileMiddleware {
    pub fn new(directory: ProfileDirectory, jobs: BackgroundJobs) -> Self {
        Self {
            directory,
            latency: Duration::from_millis(50),
            jobs,
        }
    }

    /// Simulated round-trip time of a lookup
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn load(&self, store: &Store<AppState, Action>, id: u64) {
        let store = store.clone();
        let directory = Arc::clone(&self.directory);
        let latency = self.latency;

        self.jobs.track(thread::spawn(move || {
            thread::sleep(latency);
            let result = match directory.get(&id) {
                Some(email) => UserAction::ProfileLoaded {
                    id,
                    email: email.clone(),
                },
                None => UserAction::ProfileFailed {
                    id,
                    reason: format!("no profile with id {}", id),
                },
            };
            if let Err(e) = store.dispatch(Action::User(result)) {
                log::error!("Failed to deliver profile {}: {}", id, e);
            }
        }));
    }
}

impl Middleware<AppState, Action> for ProfileMiddleware {
    fn name(&self) -> &str {
        "profile"
    }

    fn handle(
        &mut self,
        store: &Store<AppState, Action>,
        action: Action,
        mut next: Next<'_, AppState, Action>,
    ) -> Result<(), StoreError> {
        let requested = match &action {
            Action::User(UserAction::ProfileRequested(id)) => Some(*id),
            _ => None,
        };

        // Commit the Loading state first so the result always finds it
        next.run(action)?;

        if let Some(id) = requested {
            log::debug!("Loading profile {} in background", id);
            self.load(store, id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::reduce;
    use crate::state::ProfileStatus;
    use pretty_assertions::assert_eq;

    fn store_with(directory: HashMap<u64, String>) -> (Store<AppState, Action>, BackgroundJobs) {
        let jobs = BackgroundJobs::default();
        let store = Store::builder(reduce, AppState::default())
            .middleware(
                ProfileMiddleware::new(Arc::new(directory), jobs.clone())
                    .with_latency(Duration::ZERO),
            )
            .build();
        (store, jobs)
    }

    #[test]
    fn test_profile_loads_in_background() {
        let (store, jobs) = store_with(HashMap::from([(1, "carl@example.com".to_string())]));

        store
            .dispatch(Action::User(UserAction::ProfileRequested(1)))
            .unwrap();
        jobs.wait();

        assert_eq!(
            store.get_state().user.profile,
            ProfileStatus::Loaded {
                id: 1,
                email: "carl@example.com".into()
            }
        );
    }

    #[test]
    fn test_unknown_profile_fails() {
        let (store, jobs) = store_with(HashMap::new());

        store
            .dispatch(Action::User(UserAction::ProfileRequested(9)))
            .unwrap();
        jobs.wait();

        assert!(matches!(
            store.get_state().user.profile,
            ProfileStatus::Failed { id: 9, .. }
        ));
    }
}
