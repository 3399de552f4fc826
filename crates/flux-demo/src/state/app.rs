//! Application State

use super::{CounterState, UserState};
use serde::Serialize;
use std::sync::Arc;

/// Application state
///
/// Each slice sits behind its own `Arc` so an update to one slice leaves
/// the other reference-identical.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AppState {
    pub counter: Arc<CounterState>,
    pub user: Arc<UserState>,
}
