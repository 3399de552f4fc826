use serde::Serialize;

/// Loading state of the user's remote profile
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum ProfileStatus {
    #[default]
    Idle,
    Loading(u64),
    Loaded { id: u64, email: String },
    Failed { id: u64, reason: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UserState {
    pub name: String,
    pub profile: ProfileStatus,
}
