use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, info};

/// The platform's "open with default application" command for `path`.
pub fn opener_command(path: &Path) -> Command {
    #[cfg(target_os = "windows")]
    let command = {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]).arg(path);
        command
    };
    #[cfg(target_os = "macos")]
    let command = {
        let mut command = Command::new("open");
        command.arg(path);
        command
    };
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let command = {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    };
    command
}

/// Opens `path` in the user's editor without blocking the render loop.
pub fn open_path(path: &Path) -> io::Result<()> {
    let mut child = opener_command(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    info!(path = %path.display(), "opening scene in the default editor");
    thread::Builder::new()
        .name("scene-opener".into())
        .spawn(move || match child.wait() {
            Ok(status) => debug!(%status, "opener exited"),
            Err(err) => debug!(error = %err, "failed to wait for opener"),
        })?;
    Ok(())
}
