//! Task graph runner for notebook and pipeline repositories.
//!
//! Tasks are declared in TOML with prerequisites, shell command templates and
//! optional status lines. Command templates may reference named file sets,
//! which are globbed right before the command runs:
//!
//! ```toml
//! [fileset.all_notebooks]
//! patterns = ["notebooks/**/*.ipynb"]
//!
//! [task.format-notebooks-check]
//! commands = ["nbstripout --keep-id --verify ${all_notebooks}"]
//! success = "Notebooks are clean."
//!
//! [task.test-notebooks]
//! dependencies = ["format-notebooks-check"]
//! ```
//!
//! Running a task runs its prerequisites first, depth-first and left to right,
//! each at most once, and stops at the first command that exits non-zero.

pub mod cli;
pub mod error;
pub mod execution;
pub mod fileset;
pub mod task;
pub mod util;

pub use error::{NbrunError, Result};
pub use execution::{PlannedTask, TaskRunner};
pub use fileset::{FileSetDef, FileSets, resolve_pattern};
pub use task::{Task, TaskConfiguration, load_builtin, load_tasks};
