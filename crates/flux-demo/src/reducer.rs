use crate::actions::Action;
use crate::reducers::{counter_reducer, user_reducer};
use crate::state::AppState;
use flux_store::Mutation;
use std::sync::Arc;

/// Reducer - pure function that produces new state from current state + action
/// This is the root reducer that orchestrates all sub-reducers
pub fn reduce(state: &Arc<AppState>, action: &Action) -> anyhow::Result<Arc<AppState>> {
    let mut mutation = Mutation::new();

    let counter = match action {
        Action::Counter(action) => {
            mutation.try_mutate(&state.counter, action, counter_reducer::reduce_counter)?
        }
        _ => Arc::clone(&state.counter),
    };
    let user = match action {
        Action::User(action) => mutation.mutate(&state.user, action, user_reducer::reduce_user),
        _ => Arc::clone(&state.user),
    };

    // Only allocate a new root if a slice actually changed
    Ok(mutation.finish(state, || AppState { counter, user }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{CounterAction, UserAction};

    #[test]
    fn test_counter_action_keeps_user_slice() {
        let state = Arc::new(AppState::default());
        let next = reduce(&state, &Action::Counter(CounterAction::Increment(1))).unwrap();

        assert_eq!(next.counter.value, 1);
        assert!(Arc::ptr_eq(&state.user, &next.user));
    }

    #[test]
    fn test_noop_returns_same_root() {
        let state = Arc::new(AppState::default());
        let next = reduce(&state, &Action::User(UserAction::SetName(String::new()))).unwrap();
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn test_failing_sub_reducer_fails_root() {
        let state = Arc::new(AppState::default());
        assert!(reduce(&state, &Action::Counter(CounterAction::Decrement(1))).is_err());
    }
}
