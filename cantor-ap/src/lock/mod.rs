//! Mutual exclusion for player and console mutation

pub mod coordinator;
pub mod gate;
pub mod privileged;

pub use coordinator::LockCoordinator;
pub use gate::ExclusiveGate;
pub use privileged::PrivilegedOverride;
