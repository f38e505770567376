use std::{io, path::Path, process::ExitStatus, process::Stdio};

use tokio::process::Command as TokioCommand;

/// Runs `command` through the platform shell in `cwd` and waits for it to exit.
///
/// The child shares the runner's stdout and stderr, so tool output reaches the
/// terminal as it is produced.
pub async fn run_command(command: &str, cwd: &Path) -> io::Result<ExitStatus> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = TokioCommand::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = TokioCommand::new("sh");
        c.args(["-c", command]);
        c
    };

    cmd.current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;
    child.wait().await
}

/// The signal that terminated the child, if any.
#[cfg(unix)]
pub fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
pub fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
