pub mod counter_reducer;
pub mod user_reducer;
