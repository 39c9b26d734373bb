use crate::ecs::SystemHandle;
use thiserror::Error;

/// Errors that can occur while registering a system with the world.
#[derive(Debug, Error)]
pub enum SystemRegistrationError {
    #[error("system '{name}' is already registered as {existing}")]
    DuplicateName { name: String, existing: SystemHandle },

    #[error("system '{name}' cannot be registered while the world is stepping")]
    WorldRunning { name: String },
}
