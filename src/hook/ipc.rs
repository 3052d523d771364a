//! Subprocess IPC with the hook script.
//!
//! One child process per invocation: the hook binary at
//! `<workspace>/hooks/<name>` is spawned with the invoked hook name as its
//! single argument, receives one JSON document on stdin, and answers with
//! newline-delimited JSON on stdout. `{"log": ...}` lines are a side
//! channel into the debug log; every other line is shallow-merged
//! (right-biased) into the result. Stderr is forwarded to the debug log
//! line by line.

use std::process::Stdio;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

use crate::config::Config;
use crate::error::HookError;

/// Invoke the hook script once and return its merged JSONL output.
///
/// A missing hook script is not an error: the invocation degrades to an
/// empty result so the plugin keeps running without a hook installed.
pub async fn invoke(
    config: &Config,
    name: &str,
    input: &Value,
) -> Result<Map<String, Value>, HookError> {
    let path = config.hook_path();
    if !path.is_file() {
        tracing::debug!(
            "{} no hook at {}, skipping {}",
            config.glyph,
            path.display(),
            name
        );
        return Ok(Map::new());
    }

    let mut child = Command::new(&path)
        .arg(name)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| HookError::Spawn {
            path: path.display().to_string(),
            source: e,
        })?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let stdout_handle = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = BufReader::new(stdout).read_to_string(&mut buf).await;
        buf
    });

    let glyph = config.glyph.clone();
    let hook_name = name.to_string();
    let stderr_handle = tokio::spawn(async move {
        let reader = BufReader::new(stderr);
        let mut lines = reader.lines();
        let mut collected = String::new();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!("{} {} stderr: {}", glyph, hook_name, line);
            if !collected.is_empty() {
                collected.push('\n');
            }
            collected.push_str(&line);
        }
        collected
    });

    // The timeout window covers the whole invocation, starting at spawn.
    let deadline = tokio::time::Instant::now() + config.hook_timeout;

    let payload = serde_json::to_vec(input)?;
    if let Some(mut stdin) = child.stdin.take() {
        let write = async {
            let result = stdin.write_all(&payload).await;
            drop(stdin); // close stdin, signalling EOF
            result
        };
        match tokio::time::timeout_at(deadline, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                // A hook may exit without ever reading stdin; that is its choice.
                tracing::debug!(
                    "{} failed to write {} payload to stdin: {}",
                    config.glyph,
                    name,
                    e
                );
            }
            Err(_) => {
                kill(&mut child).await;
                return Err(HookError::Timeout {
                    name: name.to_string(),
                    timeout: config.hook_timeout,
                });
            }
        }
    }

    let status = match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => return Err(HookError::Io(e)),
        Err(_) => {
            kill(&mut child).await;
            return Err(HookError::Timeout {
                name: name.to_string(),
                timeout: config.hook_timeout,
            });
        }
    };

    let stdout_buf = stdout_handle.await.unwrap_or_default();
    let stderr_buf = stderr_handle.await.unwrap_or_default();

    if !status.success() {
        let code = match status.code() {
            Some(code) => code.to_string(),
            None => "signal".to_string(),
        };
        return Err(HookError::Exit {
            name: name.to_string(),
            status: code,
            stderr: stderr_buf,
        });
    }

    parse_jsonl(name, &config.glyph, &stdout_buf)
}

/// Terminate a child that outlived its timeout, reaping it with a short grace.
async fn kill(child: &mut Child) {
    let _ = child.start_kill();
    let _ = tokio::time::timeout(Duration::from_secs(1), child.wait()).await;
}

/// Merge a newline-delimited JSON buffer into a single object.
///
/// Blank lines are skipped; `{"log": s}` lines are forwarded to the debug
/// log and discarded; all other object lines are merged right-biased. Any
/// line that is not a JSON object fails the whole invocation.
fn parse_jsonl(name: &str, glyph: &str, buffer: &str) -> Result<Map<String, Value>, HookError> {
    let mut merged = Map::new();
    for line in buffer.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| HookError::Malformed {
            name: name.to_string(),
            line: line.to_string(),
            reason: e.to_string(),
        })?;
        let Value::Object(object) = value else {
            return Err(HookError::Malformed {
                name: name.to_string(),
                line: line.to_string(),
                reason: "expected a JSON object".to_string(),
            });
        };
        if let Some(log) = object.get("log").and_then(Value::as_str) {
            tracing::debug!("{} {}: {}", glyph, name, log);
            continue;
        }
        for (key, value) in object {
            merged.insert(key, value);
        }
    }
    Ok(merged)
}
