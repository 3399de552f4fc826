use serde::Serialize;

/// Root action type
///
/// Actions are namespaced per state slice so each sub-reducer only
/// ever sees the actions it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Action {
    Counter(CounterAction),
    User(UserAction),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CounterAction {
    Increment(i64),
    /// Rejected by the reducer if the counter would drop below zero
    Decrement(i64),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UserAction {
    SetName(String),
    /// Start loading a profile; handled off-lock by ProfileMiddleware
    ProfileRequested(u64),
    ProfileLoaded { id: u64, email: String },
    ProfileFailed { id: u64, reason: String },
}
