use crate::ecs::Stage;

/// Metadata describing where a system runs within a world step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemDescriptor {
    name: String,
    stage: Stage,
}

impl SystemDescriptor {
    /// Create a new descriptor in the [`Stage::Update`] stage.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: Stage::default(),
        }
    }

    /// Move the system to another stage.
    pub fn in_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    /// Unique system name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}
