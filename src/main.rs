use clap::Parser;
use serde::Serialize;
use std::process;

use nbrun::{
    NbrunError, Result, Task, TaskConfiguration, TaskRunner,
    cli::{Cli, Command},
    task::load_configuration,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    if let Err(e) = run_nbrun(args).await {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

async fn run_nbrun(args: Cli) -> Result<()> {
    let config = load_configuration(args.file.as_deref())?;

    match args.command {
        Command::Run { task, dry_run } => {
            let target = task
                .or_else(|| config.default_task.clone())
                .ok_or(NbrunError::NoTask)?;
            let runner = TaskRunner::new(&config);

            if dry_run {
                println!("Dry run mode - showing what would be executed:");
                for planned in runner.dry_run(&target)? {
                    for command in &planned.commands {
                        println!("  {} would run: {}", planned.id, command);
                    }
                }
                return Ok(());
            }

            runner.run(&target).await?;
            Ok(())
        }
        Command::List { json } => list_tasks(&config, json),
    }
}

#[derive(Serialize)]
struct TaskListing<'a> {
    default: Option<&'a str>,
    tasks: &'a [Task],
}

fn list_tasks(config: &TaskConfiguration, json: bool) -> Result<()> {
    if json {
        let listing = TaskListing {
            default: config.default_task.as_deref(),
            tasks: &config.tasks,
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    let width = config.tasks.iter().map(|t| t.id.len()).max().unwrap_or(0);
    for task in &config.tasks {
        let marker = if config.default_task.as_deref() == Some(task.id.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!(
            "{:width$}  {}{}",
            task.id,
            task.description.as_deref().unwrap_or(""),
            marker,
            width = width
        );
        if !task.dependencies.is_empty() {
            println!("{:width$}    after: {}", "", task.dependencies.join(", "), width = width);
        }
    }

    Ok(())
}
