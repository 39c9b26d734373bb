use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed phases of a world step, in execution order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Runs once, on the very first step only.
    OnFirstStep,
    PreUpdate,
    #[default]
    Update,
    PostUpdate,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::OnFirstStep,
        Stage::PreUpdate,
        Stage::Update,
        Stage::PostUpdate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::OnFirstStep => "on_first_step",
            Stage::PreUpdate => "pre_update",
            Stage::Update => "update",
            Stage::PostUpdate => "post_update",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
