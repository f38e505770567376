use std::{
    collections::{HashMap, HashSet},
    env, fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::{Captures, Regex};
use serde::Deserialize;

use super::{Task, dependency::validate_tasks};
use crate::{
    error::{NbrunError, Result},
    fileset::{FileSetDef, FileSets},
};

pub const DEFAULT_CONFIG_FILE: &str = "nbrun.toml";

/// Task declaration compiled into the binary, used when no task file exists.
pub const BUILTIN_CONFIG: &str = include_str!("builtin.toml");

static BRACED_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("braced variable pattern is valid")
});
static SIMPLE_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("simple variable pattern is valid")
});

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(rename = "task", default)]
    tasks: HashMap<String, Task>,
    #[serde(rename = "fileset", default)]
    file_sets: HashMap<String, FileSetDef>,
    config: Option<ConfigSection>,
    #[serde(default)]
    variables: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ConfigSection {
    default: Option<String>,
}

#[derive(Debug)]
pub struct TaskConfiguration {
    pub tasks: Vec<Task>,
    pub file_sets: FileSets,
    pub default_task: Option<String>,
}

impl TaskConfiguration {
    pub fn task_map(&self) -> HashMap<&str, &Task> {
        self.tasks.iter().map(|t| (t.id.as_str(), t)).collect()
    }

    pub fn root(&self) -> &Path {
        self.file_sets.root()
    }
}

/// Picks the task declaration for an invocation.
///
/// An explicit file must exist. Without one, `nbrun.toml` in the current
/// directory is used when present, otherwise the built-in declaration.
pub fn load_configuration(file: Option<&Path>) -> Result<TaskConfiguration> {
    match file {
        Some(path) => load_tasks(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                load_tasks(default_path)
            } else {
                load_builtin(".")
            }
        }
    }
}

/// Loads a task file. Patterns and commands are relative to the file's directory.
pub fn load_tasks(config_path: &Path) -> Result<TaskConfiguration> {
    let contents = fs::read_to_string(config_path)?;
    let root = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    log::debug!("Loading tasks from {}", config_path.display());
    parse_tasks(&contents, root)
}

/// Loads the built-in declaration with `root` as the project directory.
pub fn load_builtin(root: impl Into<PathBuf>) -> Result<TaskConfiguration> {
    log::debug!("Using built-in task declaration");
    parse_tasks(BUILTIN_CONFIG, root.into())
}

pub fn parse_tasks(contents: &str, root: PathBuf) -> Result<TaskConfiguration> {
    let config: Config = toml::from_str(contents)?;
    process_config(config, root)
}

fn process_config(config: Config, root: PathBuf) -> Result<TaskConfiguration> {
    let default_task = config.config.as_ref().and_then(|c| c.default.clone());

    let mut variables = config.variables;
    apply_environment_overrides(&mut variables);
    add_builtin_variables(&mut variables, &root);

    let mut tasks: Vec<Task> = config
        .tasks
        .into_iter()
        .map(|(name, mut task)| {
            if task.id.is_empty() {
                task.id = name;
            }
            substitute_variables_in_task(&mut task, &variables);
            task
        })
        .collect();
    tasks.sort_by(|a, b| a.id.cmp(&b.id));

    validate_tasks(&tasks)?;
    validate_file_sets(&config.file_sets)?;

    if let Some(default) = &default_task {
        if !tasks.iter().any(|t| &t.id == default) {
            return Err(NbrunError::UnknownTask(default.clone()));
        }
    }

    Ok(TaskConfiguration {
        tasks,
        file_sets: FileSets::new(root, config.file_sets),
        default_task,
    })
}

/// A declared variable is replaced by an environment variable of the same name.
fn apply_environment_overrides(variables: &mut HashMap<String, String>) {
    for (key, value) in variables.iter_mut() {
        if let Ok(from_env) = env::var(key) {
            log::debug!("Variable {} overridden from environment", key);
            *value = from_env;
        }
    }
}

/// `PWD` is the directory commands run in, not the directory nbrun was started from.
fn add_builtin_variables(variables: &mut HashMap<String, String>, root: &Path) {
    for (key, value) in env::vars_os() {
        match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => {
                variables.insert(format!("ENV_{}", key), value);
            }
            (key, _) => log::debug!("Skipping non UTF-8 environment variable {:?}", key),
        }
    }

    match std::path::absolute(root) {
        Ok(pwd) => {
            variables.insert("PWD".to_string(), pwd.to_string_lossy().to_string());
        }
        Err(e) => log::warn!("Could not resolve project root {}: {}", root.display(), e),
    }
}

fn substitute_variables_in_task(task: &mut Task, variables: &HashMap<String, String>) {
    task.commands = task
        .commands
        .iter()
        .map(|command| substitute_variables(command, variables))
        .collect();
}

fn substitute_variables(text: &str, variables: &HashMap<String, String>) -> String {
    let result = BRACED_VARIABLE
        .replace_all(text, |caps: &Captures| lookup_variable(caps, variables))
        .to_string();

    SIMPLE_VARIABLE
        .replace_all(&result, |caps: &Captures| lookup_variable(caps, variables))
        .to_string()
}

fn lookup_variable(caps: &Captures, variables: &HashMap<String, String>) -> String {
    variables
        .get(&caps[1])
        .cloned()
        .unwrap_or_else(|| caps[0].to_string())
}

fn validate_file_sets(defs: &HashMap<String, FileSetDef>) -> Result<()> {
    for (name, def) in defs {
        for include in &def.include {
            if !defs.contains_key(include) {
                return Err(NbrunError::Dependency(format!(
                    "File set '{}' includes '{}' which doesn't exist",
                    name, include
                )));
            }
        }
    }

    for name in defs.keys() {
        let mut path = Vec::new();
        if let Some(cycle) = find_include_cycle(name, defs, &mut path, &mut HashSet::new()) {
            return Err(NbrunError::Dependency(format!(
                "Circular file set include: {}",
                cycle.join(" -> ")
            )));
        }
    }

    Ok(())
}

fn find_include_cycle<'a>(
    name: &'a str,
    defs: &'a HashMap<String, FileSetDef>,
    path: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Option<Vec<String>> {
    if let Some(start) = path.iter().position(|n| *n == name) {
        let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
        cycle.push(name.to_string());
        return Some(cycle);
    }
    if done.contains(name) {
        return None;
    }

    path.push(name);
    if let Some(def) = defs.get(name) {
        for include in &def.include {
            if let Some(cycle) = find_include_cycle(include, defs, path, done) {
                return Some(cycle);
            }
        }
    }
    path.pop();
    done.insert(name);

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(contents: &str) -> Result<TaskConfiguration> {
        parse_tasks(contents, PathBuf::from("."))
    }

    #[test]
    fn builtin_declaration_matches_the_documented_graph() {
        let config = load_builtin(".").unwrap();
        let tasks = config.task_map();

        let expected = [
            "format-notebooks",
            "format-notebooks-check",
            "format-python",
            "format-python-check",
            "test-all",
            "test-notebook-execution",
            "test-notebook-parameters",
            "test-notebooks",
        ];
        let mut ids: Vec<&str> = tasks.keys().copied().collect();
        ids.sort();
        assert_eq!(ids, expected);

        assert_eq!(
            tasks["test-notebooks"].dependencies,
            vec![
                "format-notebooks-check",
                "test-notebook-parameters",
                "test-notebook-execution"
            ]
        );
        assert_eq!(
            tasks["test-all"].dependencies,
            vec!["test-notebooks", "format-python-check"]
        );
        for id in [
            "format-python",
            "format-notebooks",
            "format-notebooks-check",
            "format-python-check",
            "test-notebook-parameters",
            "test-notebook-execution",
        ] {
            assert!(tasks[id].dependencies.is_empty(), "{} has prerequisites", id);
        }

        assert!(
            tasks["test-notebook-parameters"].commands[0]
                .ends_with("tests/test_notebook_parameters.py -v")
        );
        assert!(
            tasks["test-notebook-execution"].commands[0]
                .ends_with("tests/test_notebook_execution.py -v")
        );
        assert!(tasks["format-notebooks-check"].commands[0].contains("--verify"));
        assert!(tasks["format-python-check"].commands[0].contains("--check"));
        assert_eq!(config.default_task.as_deref(), Some("test-all"));

        for name in ["all_notebooks", "all_python"] {
            assert!(config.file_sets.contains(name));
        }
    }

    #[test]
    fn task_ids_default_to_table_keys() {
        let config = parse(
            r#"
            [task.build]
            commands = ["echo build"]

            [task.renamed]
            id = "custom"
            commands = ["echo custom"]
            "#,
        )
        .unwrap();

        let ids: Vec<&str> = config.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["build", "custom"]);
    }

    #[test]
    fn variables_are_substituted_and_file_sets_are_kept() {
        let config = parse(
            r#"
            [variables]
            NBRUN_TEST_FORMATTER = "ruff"

            [fileset.all_python]
            patterns = ["src/*.py"]

            [task.fmt]
            commands = ["${NBRUN_TEST_FORMATTER} format ${all_python}", "echo $NBRUN_TEST_FORMATTER"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.tasks[0].commands,
            vec!["ruff format ${all_python}", "echo ruff"]
        );
    }

    #[test]
    fn missing_prerequisite_is_rejected() {
        let err = parse(
            r#"
            [task.a]
            dependencies = ["ghost"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, NbrunError::UnknownTask(name) if name == "ghost"));
    }

    #[test]
    fn unknown_default_task_is_rejected() {
        let err = parse(
            r#"
            [config]
            default = "nope"

            [task.a]
            commands = ["true"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, NbrunError::UnknownTask(name) if name == "nope"));
    }

    #[test]
    fn file_set_include_problems_are_rejected() {
        let missing = parse(
            r#"
            [fileset.all]
            include = ["nothing"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(missing, NbrunError::Dependency(msg) if msg.contains("nothing")));

        let cycle = parse(
            r#"
            [fileset.a]
            include = ["b"]

            [fileset.b]
            include = ["a"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(cycle, NbrunError::Dependency(msg) if msg.contains("Circular")));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(parse("[task.a"), Err(NbrunError::Parse(_))));
    }

    #[test]
    fn pwd_is_the_project_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let project = dir.path().join("ci");

        let config = parse_tasks(
            "[task.where]\ncommands = [\"echo $PWD\", \"echo ${PWD}/out\"]\n",
            project.clone(),
        )
        .unwrap();

        let pwd = project.to_string_lossy();
        assert_eq!(
            config.tasks[0].commands,
            vec![format!("echo {}", pwd), format!("echo {}/out", pwd)]
        );
    }

    #[test]
    fn explicit_missing_file_is_an_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            load_configuration(Some(&missing)),
            Err(NbrunError::Io(_))
        ));
    }

    #[test]
    fn root_is_the_task_file_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[task.a]\ncommands = [\"true\"]\n").unwrap();

        let config = load_tasks(&path).unwrap();
        assert_eq!(config.root(), dir.path());
    }
}
