use std::path::Path;
use tokio::process::Command;

/// Open the user's settings with `command <target>` in the background.
///
/// The screen does not wait for the editor; it rereads consent the next
/// time recording is requested.
pub fn open(command: &str, target: &Path) {
    let command = command.to_owned();
    let target = target.to_owned();

    tokio::task::spawn_local(async move {
        tracing::info!("Opening settings: {} {:?}", command, target);

        match Command::new(&command)
            .arg(&target)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
        {
            Ok(child) => match child.wait_with_output().await {
                Ok(output) => {
                    if !output.status.success() {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        tracing::warn!("{} exited with {}: {}", command, output.status, stderr.trim());
                    }
                }
                Err(e) => tracing::warn!("Failed to wait on {}: {}", command, e),
            },
            Err(e) => tracing::warn!("Failed to run {}: {}", command, e),
        }
    });
}
