//
// Copyright (c) 2024 Nathan Fiedler
//
mod coordinator;
mod debounce;
mod gate;

pub use coordinator::{UserListCoordinator, UserListState};
pub use debounce::Debouncer;
