mod actions;
mod logger;
mod middleware;
mod reducer;
mod reducers;
mod state;

use actions::{Action, CounterAction, UserAction};
use flux_store::{LoggingMiddleware, SnapshotLog, SnapshotMiddleware, Store, StoreConfig};
use middleware::profile_middleware::{BackgroundJobs, ProfileMiddleware};
use state::{AppState, ProfileStatus};
use std::collections::HashMap;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let log_file = logger::init()?;
    log::info!("Starting flux-demo");

    let config = StoreConfig::load();
    let snapshots = SnapshotLog::new(config.snapshot_capacity);
    let jobs = BackgroundJobs::default();
    let directory = Arc::new(HashMap::from([(1, "carl@example.com".to_string())]));

    // Middleware executes in this order; logging sees every action first
    let store = Store::builder(reducer::reduce, AppState::default())
        .config(&config)
        .middleware(LoggingMiddleware::new())
        .middleware(SnapshotMiddleware::new(snapshots.clone()))
        .middleware(ProfileMiddleware::new(directory, jobs.clone()))
        .build();

    let _counter_view = store.subscribe(
        |state: &AppState| state.counter.value,
        |value| {
            println!("counter: {}", value);
            Ok(())
        },
    );
    let _name_view = store.subscribe(
        |state: &AppState| state.user.name.clone(),
        |name| {
            println!("name: {:?}", name);
            Ok(())
        },
    );
    let _profile_view = store.subscribe(
        |state: &AppState| state.user.profile.clone(),
        |profile| {
            match profile {
                ProfileStatus::Idle => {}
                ProfileStatus::Loading(id) => println!("profile {}: loading", id),
                ProfileStatus::Loaded { id, email } => println!("profile {}: {}", id, email),
                ProfileStatus::Failed { id, reason } => println!("profile {}: {}", id, reason),
            }
            Ok(())
        },
    );

    let script = [
        Action::Counter(CounterAction::Increment(2)),
        Action::User(UserAction::SetName("Carl".into())),
        Action::Counter(CounterAction::Increment(4)),
        Action::User(UserAction::ProfileRequested(1)),
    ];
    for action in script {
        store.dispatch(action)?;
    }
    jobs.wait();

    // Rejected by the counter reducer; state stays as it was
    if let Err(e) = store.dispatch(Action::Counter(CounterAction::Decrement(100))) {
        println!("rejected: {}", e);
    }

    println!(
        "final state: {}",
        serde_json::to_string_pretty(&*store.get_state())?
    );
    println!("history: {}", snapshots.to_json()?);

    log::info!("Exiting flux-demo (log: {})", log_file.display());
    Ok(())
}
