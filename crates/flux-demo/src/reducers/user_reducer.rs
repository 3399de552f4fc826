//! User Reducer

use crate::actions::UserAction;
use crate::state::{ProfileStatus, UserState};
use std::sync::Arc;

/// Reducer for user state.
///
/// Accepts only UserAction. Profile results are applied only if they answer
/// the request currently in flight; stale results are ignored.
pub fn reduce_user(state: &Arc<UserState>, action: &UserAction) -> Arc<UserState> {
    match action {
        UserAction::SetName(name) if *name != state.name => Arc::new(UserState {
            name: name.clone(),
            ..(**state).clone()
        }),
        UserAction::ProfileRequested(id) if state.profile != ProfileStatus::Loading(*id) => {
            with_profile(state, ProfileStatus::Loading(*id))
        }
        UserAction::ProfileLoaded { id, email } if is_loading(state, *id) => with_profile(
            state,
            ProfileStatus::Loaded {
                id: *id,
                email: email.clone(),
            },
        ),
        UserAction::ProfileFailed { id, reason } if is_loading(state, *id) => with_profile(
            state,
            ProfileStatus::Failed {
                id: *id,
                reason: reason.clone(),
            },
        ),
        UserAction::ProfileLoaded { id, .. } | UserAction::ProfileFailed { id, .. } => {
            log::debug!("Ignoring stale profile result for {}", id);
            Arc::clone(state)
        }
        _ => Arc::clone(state),
    }
}

fn is_loading(state: &UserState, id: u64) -> bool {
    state.profile == ProfileStatus::Loading(id)
}

fn with_profile(state: &Arc<UserState>, profile: ProfileStatus) -> Arc<UserState> {
    Arc::new(UserState {
        name: state.name.clone(),
        profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_same_name_keeps_reference() {
        let state = Arc::new(UserState {
            name: "Carl".into(),
            ..UserState::default()
        });
        let next = reduce_user(&state, &UserAction::SetName("Carl".into()));
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn test_profile_request_then_load() {
        let state = Arc::new(UserState::default());
        let loading = reduce_user(&state, &UserAction::ProfileRequested(7));
        assert_eq!(loading.profile, ProfileStatus::Loading(7));

        let loaded = reduce_user(
            &loading,
            &UserAction::ProfileLoaded {
                id: 7,
                email: "carl@example.com".into(),
            },
        );
        assert_eq!(
            loaded.profile,
            ProfileStatus::Loaded {
                id: 7,
                email: "carl@example.com".into()
            }
        );
    }

    #[test]
    fn test_stale_profile_result_is_ignored() {
        let state = Arc::new(UserState {
            profile: ProfileStatus::Loading(2),
            ..UserState::default()
        });
        let next = reduce_user(
            &state,
            &UserAction::ProfileFailed {
                id: 1,
                reason: "timeout".into(),
            },
        );
        assert!(Arc::ptr_eq(&state, &next));
    }
}
