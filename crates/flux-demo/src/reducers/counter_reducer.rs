//! Counter Reducer

use crate::actions::CounterAction;
use crate::state::CounterState;
use std::sync::Arc;

/// Reducer for counter state.
///
/// Accepts only CounterAction. Returns the same `Arc` whenever the value
/// would not change, so subscribers to the counter are not woken up.
pub fn reduce_counter(
    state: &Arc<CounterState>,
    action: &CounterAction,
) -> anyhow::Result<Arc<CounterState>> {
    let value = match action {
        CounterAction::Increment(amount) => state.value + amount,
        CounterAction::Decrement(amount) => {
            let value = state.value - amount;
            if value < 0 {
                anyhow::bail!(
                    "counter cannot drop below zero ({} - {})",
                    state.value,
                    amount
                );
            }
            value
        }
        CounterAction::Reset => 0,
    };

    if value == state.value {
        return Ok(Arc::clone(state));
    }
    Ok(Arc::new(CounterState { value }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(value: i64) -> Arc<CounterState> {
        Arc::new(CounterState { value })
    }

    #[test]
    fn test_increment() {
        let next = reduce_counter(&counter(1), &CounterAction::Increment(2)).unwrap();
        assert_eq!(next.value, 3);
    }

    #[test]
    fn test_decrement_below_zero_fails() {
        let result = reduce_counter(&counter(1), &CounterAction::Decrement(2));
        assert!(result.is_err());
    }

    #[test]
    fn test_reset_at_zero_keeps_reference() {
        let state = counter(0);
        let next = reduce_counter(&state, &CounterAction::Reset).unwrap();
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn test_zero_increment_keeps_reference() {
        let state = counter(5);
        let next = reduce_counter(&state, &CounterAction::Increment(0)).unwrap();
        assert!(Arc::ptr_eq(&state, &next));
    }
}
