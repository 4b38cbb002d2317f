use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::observer::{Channel, Observer};
use crate::{RunOutput, Runner, RunnerError};

/// I run scripts on the local file-system, under a fixed root path.
///
/// Directory traversal outside that root is rejected as [`RunnerError::NotFound`],
/// matching the original script-side contract: the script must exist and be
/// executable, or the run never starts.
pub struct LocalRunner {
    root: PathBuf,
}

impl LocalRunner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, script: &str) -> Result<PathBuf, RunnerError> {
        let canon_root = self.root.canonicalize().map_err(|_| RunnerError::NotFound)?;
        let candidate = self.root.join(script);
        let canon = candidate.canonicalize().map_err(|_| RunnerError::NotFound)?;

        if !canon.starts_with(&canon_root) {
            return Err(RunnerError::NotFound);
        }

        let meta = std::fs::metadata(&canon).map_err(|_| RunnerError::NotFound)?;
        if !meta.is_file() {
            return Err(RunnerError::NotFound);
        }
        if !is_executable(&canon) {
            return Err(RunnerError::NotFound);
        }

        Ok(canon)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[async_trait::async_trait]
impl Runner for LocalRunner {
    async fn run(
        &self,
        script: &str,
        args: &[String],
        env: HashMap<String, String>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Result<RunOutput, RunnerError> {
        let script_path = self.resolve(script)?;
        let working_dir = script_path
            .parent()
            .expect("resolved script path always has a parent")
            .to_path_buf();

        let mut command = Command::new(&script_path);
        command
            .args(args)
            .env_clear()
            .envs(env)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(script = %script_path.display(), "spawning script");
        let mut child = command.spawn()?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let stdout_task = tokio::spawn(pump(stdout, Channel::Stdout, observer.clone()));
        let stderr_task = tokio::spawn(pump(stderr, Channel::Stderr, observer.clone()));

        let status = child.wait().await?;
        let stdout = stdout_task.await.expect("stdout pump does not panic");
        let stderr = stderr_task.await.expect("stderr pump does not panic");
        let exit_code = status.code().unwrap_or(-1);

        if let Some(observer) = &observer {
            observer.on_exit(exit_code).await;
        }

        Ok(RunOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

async fn pump(
    mut reader: impl tokio::io::AsyncRead + Unpin,
    channel: Channel,
    observer: Option<Arc<dyn Observer>>,
) -> Vec<u8> {
    let mut collected = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        collected.extend_from_slice(&chunk[..n]);
        if let Some(observer) = &observer {
            observer.on_output(channel, chunk[..n].to_vec()).await;
        }
    }
    collected
}
