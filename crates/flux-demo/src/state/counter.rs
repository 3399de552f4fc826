use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CounterState {
    pub value: i64,
}
