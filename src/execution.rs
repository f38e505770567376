use std::collections::HashMap;

use crate::{
    error::{NbrunError, Result},
    task::{Task, TaskConfiguration, plan_invocation, template},
    util::{run_command, termination_signal},
};

/// One planned task with its commands expanded against the current filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTask {
    pub id: String,
    pub commands: Vec<String>,
}

pub struct TaskRunner<'a> {
    config: &'a TaskConfiguration,
    tasks: HashMap<&'a str, &'a Task>,
}

impl<'a> TaskRunner<'a> {
    pub fn new(config: &'a TaskConfiguration) -> Self {
        Self {
            config,
            tasks: config.task_map(),
        }
    }

    /// Resolves the tasks `target` needs, in execution order.
    pub fn plan(&self, target: &str) -> Result<Vec<&'a Task>> {
        let order = plan_invocation(&self.tasks, target)?;
        order
            .iter()
            .map(|id| {
                self.tasks
                    .get(id.as_str())
                    .copied()
                    .ok_or_else(|| NbrunError::UnknownTask(id.clone()))
            })
            .collect()
    }

    /// Plans `target` and expands every command without running anything.
    pub fn dry_run(&self, target: &str) -> Result<Vec<PlannedTask>> {
        self.plan(target)?
            .into_iter()
            .map(|task| -> Result<PlannedTask> {
                let commands = task
                    .commands
                    .iter()
                    .map(|command| self.expand(command))
                    .collect::<Result<Vec<_>>>()?;
                Ok(PlannedTask {
                    id: task.id.clone(),
                    commands,
                })
            })
            .collect()
    }

    /// Runs `target` and its prerequisites, stopping at the first failing command.
    ///
    /// Returns the ids of the tasks that ran, in order.
    pub async fn run(&self, target: &str) -> Result<Vec<String>> {
        let plan = self.plan(target)?;
        log::info!(
            "Running '{}' ({} task{})",
            target,
            plan.len(),
            if plan.len() == 1 { "" } else { "s" }
        );

        let mut completed = Vec::with_capacity(plan.len());
        for task in plan {
            self.execute_task(task).await?;
            completed.push(task.id.clone());
        }

        Ok(completed)
    }

    async fn execute_task(&self, task: &Task) -> Result<()> {
        log::debug!("Starting task '{}'", task.id);

        if let Some(start) = &task.start {
            println!("{}", start);
        }

        for template in &task.commands {
            // File sets are globbed right before the command that needs them.
            let command = self.expand(template)?;
            log::info!("[{}] {}", task.id, command);

            let status = run_command(&command, self.config.root())
                .await
                .map_err(|source| NbrunError::Spawn {
                    command: command.clone(),
                    source,
                })?;

            if !status.success() {
                log::error!("Task '{}' failed with status: {}", task.id, status);
                return Err(NbrunError::CommandFailed {
                    task: task.id.clone(),
                    command,
                    code: status.code(),
                    signal: termination_signal(&status),
                });
            }
        }

        if let Some(success) = &task.success {
            println!("{}", success);
        }

        log::debug!("Task '{}' finished", task.id);
        Ok(())
    }

    fn expand(&self, command: &str) -> Result<String> {
        let names = template::referenced_file_sets(command, &self.config.file_sets);
        if !names.is_empty() {
            log::debug!("Resolving file sets: {}", names.join(", "));
        }
        Ok(template::expand_command(command, &self.config.file_sets)?)
    }
}
