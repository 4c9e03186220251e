//! Spawns a [`ProcessSpec`], captures its combined stdout/stderr under a
//! "run" timer, and turns its exit into either a handler-built result or
//! a structured failure.

use std::process::Stdio;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use svclib_core::errors::ServiceError;
use svclib_core::metadata::Metadata;

use crate::errors::ProcessError;
use crate::handler::ProcessHandler;
use crate::process::{append_output, ProcessSpec};

/// Runs `spec`, feeding its combined output to `handler` and recording a
/// "run" timer plus any of the handler's own timers on `metadata`. The
/// child process's own call tree is *not* nested under `metadata` (there
/// is no inner servicelib call happening), only its timers are merged.
pub async fn run(
    spec: &ProcessSpec,
    handler: &mut dyn ProcessHandler,
    metadata: &Metadata,
) -> Result<Value, ServiceError> {
    let cmdline_pretty = spec.pretty_cmdline();
    tracing::debug!(cmdline = %cmdline_pretty, "calling process");

    let _timer = metadata.timer("run");
    let result = run_inner(spec, handler).await;

    // Matches the original: a failing process propagates before its timers
    // are ever merged in, so only the success path records them.
    if result.is_ok() {
        if let Some(timers) = handler.timers() {
            metadata.update_timers(&timers);
        }
    }

    result.map_err(|e| ServiceError::service_error(e.to_string()))
}

async fn run_inner(spec: &ProcessSpec, handler: &mut dyn ProcessHandler) -> Result<Value, ProcessError> {
    let mut command = Command::new(&spec.cmdline[0]);
    command
        .args(&spec.cmdline[1..])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(env) = &spec.env {
        command.env_clear();
        command.envs(env);
    }

    let mut child = command.spawn().map_err(|e| ProcessError::Spawn {
        cmdline: spec.pretty_cmdline(),
        source: e,
    })?;
    tracing::debug!(pid = ?child.id(), cmdline = %spec.pretty_cmdline(), "spawned process");

    let mut stdout_lines = BufReader::new(child.stdout.take().expect("stdout piped")).lines();
    let mut stderr_lines = BufReader::new(child.stderr.take().expect("stderr piped")).lines();

    let mut output = Vec::new();
    let mut stdout_done = false;
    let mut stderr_done = false;
    while !stdout_done || !stderr_done {
        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_done => {
                match line? {
                    Some(mut line) => {
                        line.push('\n');
                        append_output(&mut output, spec.max_output_size, line.as_bytes());
                    }
                    None => stdout_done = true,
                }
            }
            line = stderr_lines.next_line(), if !stderr_done => {
                match line? {
                    Some(mut line) => {
                        line.push('\n');
                        append_output(&mut output, spec.max_output_size, line.as_bytes());
                    }
                    None => stderr_done = true,
                }
            }
        }
    }

    let status = child.wait().await?;
    finish(spec, handler, status, output)
}

#[cfg(unix)]
fn signal_of(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

fn finish(
    spec: &ProcessSpec,
    handler: &mut dyn ProcessHandler,
    status: std::process::ExitStatus,
    output: Vec<u8>,
) -> Result<Value, ProcessError> {
    handler.cleanup();

    let signal = signal_of(&status);
    let rc = status.code();

    if signal.is_some() || rc != Some(0) {
        let cmdline = spec.pretty_cmdline();
        tracing::error!(cmdline = %cmdline, "process failed");
        handler.failed(rc, signal);
        let output_text = String::from_utf8_lossy(&output).to_string();
        return Err(match signal {
            Some(sig) => ProcessError::Killed {
                name: spec.name.clone(),
                signal: sig,
                cmdline,
                output: output_text,
            },
            None => ProcessError::NonZeroExit {
                name: spec.name.clone(),
                rc: rc.unwrap_or(-1),
                cmdline,
                output: output_text,
            },
        });
    }

    handler.results(&output).map_err(|e| ProcessError::NonZeroExit {
        name: spec.name.clone(),
        rc: 0,
        cmdline: spec.pretty_cmdline(),
        output: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoHandler {
        last_output: Vec<u8>,
    }

    impl ProcessHandler for EchoHandler {
        fn results(&mut self, output: &[u8]) -> Result<Value, ServiceError> {
            self.last_output = output.to_vec();
            Ok(json!({ "output": String::from_utf8_lossy(output) }))
        }
    }

    #[tokio::test]
    async fn captures_stdout_and_succeeds() {
        let spec = ProcessSpec::new("echo", vec!["echo".into(), "hello".into()]);
        let mut handler = EchoHandler { last_output: Vec::new() };
        let metadata = Metadata::new("test");
        let value = run(&spec, &mut handler, &metadata).await.unwrap();
        assert_eq!(value["output"], "hello\n");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let spec = ProcessSpec::new("false", vec!["false".into()]);
        let mut handler = EchoHandler { last_output: Vec::new() };
        let metadata = Metadata::new("test");
        let err = run(&spec, &mut handler, &metadata).await.unwrap_err();
        assert_eq!(err.http_status(), 500);
    }
}
