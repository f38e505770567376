use std::collections::{HashMap, HashSet};

use super::Task;
use crate::error::{NbrunError, Result};

pub fn validate_tasks(tasks: &[Task]) -> Result<()> {
    let mut task_ids: HashSet<&str> = HashSet::new();

    for task in tasks {
        if !task_ids.insert(task.id.as_str()) {
            return Err(NbrunError::Dependency(format!(
                "Task '{}' is declared more than once",
                task.id
            )));
        }
    }

    for task in tasks {
        for dep_id in &task.dependencies {
            if dep_id == &task.id {
                return Err(NbrunError::Dependency(format!(
                    "Task '{}' depends on itself",
                    task.id
                )));
            }
            if !task_ids.contains(dep_id.as_str()) {
                log::error!("Task '{}' depends on undeclared task '{}'", task.id, dep_id);
                return Err(NbrunError::UnknownTask(dep_id.clone()));
            }
        }
    }

    let task_map: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut completed = HashSet::new();
    let mut order = Vec::new();

    for task in tasks {
        visit(&task.id, &task_map, &mut completed, &mut Vec::new(), &mut order)?;
    }

    Ok(())
}

/// Orders the tasks an invocation of `target` has to run.
///
/// Prerequisites are visited depth-first, left to right, and come before the
/// task that declares them. A task reachable along several paths appears once,
/// at its first position.
pub fn plan_invocation(tasks: &HashMap<&str, &Task>, target: &str) -> Result<Vec<String>> {
    let mut completed = HashSet::new();
    let mut path = Vec::new();
    let mut order = Vec::new();

    visit(target, tasks, &mut completed, &mut path, &mut order)?;

    log::debug!("Execution order: {}", order.join(" -> "));
    Ok(order)
}

fn visit<'a>(
    task_id: &'a str,
    tasks: &HashMap<&str, &'a Task>,
    completed: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
    order: &mut Vec<String>,
) -> Result<()> {
    if completed.contains(task_id) {
        return Ok(());
    }

    if path.contains(&task_id) {
        let mut cycle: Vec<&str> = path.clone();
        cycle.push(task_id);
        return Err(NbrunError::Dependency(format!(
            "Circular dependency: {}",
            cycle.join(" -> ")
        )));
    }

    let task: &'a Task = tasks
        .get(task_id)
        .copied()
        .ok_or_else(|| NbrunError::UnknownTask(task_id.to_string()))?;

    path.push(task_id);
    for dep in &task.dependencies {
        visit(dep, tasks, completed, path, order)?;
    }
    path.pop();

    completed.insert(task_id);
    order.push(task_id.to_string());
    Ok(())
}
