pub mod config;
pub mod dependency;
pub mod template;

pub use config::{
    DEFAULT_CONFIG_FILE, TaskConfiguration, load_builtin, load_configuration, load_tasks,
};
pub use dependency::{plan_invocation, validate_tasks};

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    /// Printed before the task's own commands run.
    #[serde(default)]
    pub start: Option<String>,
    /// Printed once every command of the task has succeeded.
    #[serde(default)]
    pub success: Option<String>,
}
