mod app;
mod counter;
mod user;

pub use app::AppState;
pub use counter::CounterState;
pub use user::{ProfileStatus, UserState};
