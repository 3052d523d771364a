//! Disposable sandbox for validating candidate hook scripts.
//!
//! A candidate never runs against the live workspace: validation
//! materializes a temporary workspace that mirrors the subtrees a hook
//! conventionally reads (`traits/`, `prompts/`), installs the candidate
//! there, and runs the configured test command against it. The temporary
//! tree is removed unconditionally when validation finishes.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::config::{Config, WORKSPACE_ENV};
use crate::error::SandboxError;

/// Workspace subtrees mirrored into the sandbox.
const MIRRORED_SUBTREES: &[&str] = &["traits", "prompts"];

/// Outcome of a validation run.
#[derive(Debug, Clone)]
pub struct Validation {
    pub ok: bool,
    pub output: String,
}

/// Validate a candidate hook script in a disposable workspace.
///
/// With no `test_script` configured, every candidate passes. Errors are
/// failures of the sandbox machinery itself; a test command that exits
/// non-zero (or hangs past the hook timeout) is an `ok: false` result.
pub async fn validate(config: &Config, candidate: &str) -> Result<Validation, SandboxError> {
    let Some(test_script) = config.test_script.as_deref() else {
        return Ok(Validation {
            ok: true,
            output: "no test configured".to_string(),
        });
    };

    // RAII: the temp tree is removed on every exit path.
    let sandbox = tempfile::tempdir().map_err(SandboxError::Setup)?;

    for subtree in MIRRORED_SUBTREES {
        let src = config.workspace.join(subtree);
        if src.is_dir() {
            copy_dir(&src, &sandbox.path().join(subtree)).map_err(SandboxError::Setup)?;
        }
    }

    let hooks_dir = sandbox.path().join("hooks");
    std::fs::create_dir_all(&hooks_dir).map_err(SandboxError::Setup)?;
    let candidate_path = hooks_dir.join(&config.hook);
    std::fs::write(&candidate_path, candidate).map_err(SandboxError::Setup)?;
    set_executable(&candidate_path).map_err(SandboxError::Setup)?;

    let command_path = config.workspace.join(test_script);
    let mut child = Command::new(&command_path)
        .arg(sandbox.path())
        .env(WORKSPACE_ENV, sandbox.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SandboxError::Launch {
            command: command_path.display().to_string(),
            source: e,
        })?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");
    let stdout_handle = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = BufReader::new(stdout).read_to_string(&mut buf).await;
        buf
    });
    let stderr_handle = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
        buf
    });

    let waited = tokio::time::timeout(config.hook_timeout, child.wait()).await;
    let timed_out = waited.is_err();
    if timed_out {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }

    let mut output = stdout_handle.await.unwrap_or_default();
    output.push_str(&stderr_handle.await.unwrap_or_default());

    match waited {
        Ok(Ok(status)) if status.success() => Ok(Validation { ok: true, output }),
        Ok(Ok(status)) => {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            output.push_str(&format!("\nexit {code}"));
            Ok(Validation { ok: false, output })
        }
        Ok(Err(e)) => {
            output.push_str(&format!("\nwait failed: {e}"));
            Ok(Validation { ok: false, output })
        }
        Err(_) => {
            output.push_str(&format!(
                "\ntest command timed out after {:?}",
                config.hook_timeout
            ));
            Ok(Validation { ok: false, output })
        }
    }
}

fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

pub(crate) fn set_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}
