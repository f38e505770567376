use std::io;

use thiserror::Error;

use crate::fileset::FileSetError;

#[derive(Debug, Error)]
pub enum NbrunError {
    #[error("Task '{0}' not found")]
    UnknownTask(String),

    #[error("Task '{task}' failed: `{command}` exited with {}", describe_exit(.code, .signal))]
    CommandFailed {
        task: String,
        command: String,
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("File set error: {0}")]
    FileSet(#[from] FileSetError),

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No task given and no default task configured")]
    NoTask,
}

impl NbrunError {
    /// Process exit code for this error. Command failures pass the child's code through;
    /// a child killed by signal N maps to 128 + N, like a shell reports it.
    pub fn exit_code(&self) -> i32 {
        match self {
            NbrunError::CommandFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            NbrunError::CommandFailed {
                code: None,
                signal: Some(signal),
                ..
            } => 128 + signal,
            _ => 1,
        }
    }
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (code, signal) {
        (Some(code), _) => format!("status {}", code),
        (None, Some(signal)) => format!("signal {}", signal),
        (None, None) => "no status".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, NbrunError>;
