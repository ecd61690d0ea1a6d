//! Streaming subprocess execution.
//!
//! Spawns a [`CommandSpec`], reads stdout and stderr concurrently with
//! bounded-length line scanning (2 MiB max), and forwards each decoded line
//! onto an `mpsc` channel. The whole thing selects against a
//! [`CancellationToken`] so a stage deadline kills the child and unblocks
//! any in-flight channel send.

use std::process::Stdio;

use pr_core::CancellationToken;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::command_spec::CommandSpec;
use crate::error::RunnerError;

/// "bounded-line scanners (2 MiB max line)".
pub const MAX_LINE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct ExitStatusInfo {
    pub code: Option<i32>,
    pub cancelled: bool,
}

impl ExitStatusInfo {
    #[must_use]
    pub fn success(&self) -> bool {
        !self.cancelled && self.code == Some(0)
    }
}

/// Run `spec` to completion (or until `cancel` fires), streaming every
/// stdout/stderr line onto `tx` as it's produced. Never closes `tx` itself;
/// dropping the sender when this future resolves signals EOF to readers
/// exactly once.
pub async fn spawn_streaming(
    spec: &CommandSpec,
    cancel: &CancellationToken,
    tx: mpsc::Sender<String>,
) -> Result<ExitStatusInfo, RunnerError> {
    spawn_streaming_with_input(spec, cancel, tx, None).await
}

/// As [`spawn_streaming`], but first writes `stdin_data` to the child's
/// stdin and closes it before reading begins. Adapters for tools that read
/// a domain list from stdin (`gau`, `waybackurls`, `dnsx`, )
/// use this instead.
pub async fn spawn_streaming_with_input(
    spec: &CommandSpec,
    cancel: &CancellationToken,
    tx: mpsc::Sender<String>,
    stdin_data: Option<&str>,
) -> Result<ExitStatusInfo, RunnerError> {
    let mut cmd = spec.to_tokio_command();
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(if stdin_data.is_some() { Stdio::piped() } else { Stdio::null() });
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| RunnerError::from_spawn_error(&spec.program, e))?;
    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    if let Some(data) = stdin_data {
        let mut stdin = child.stdin.take().expect("stdin was piped");
        let data = data.to_string();
        let write_result = stdin.write_all(data.as_bytes()).await;
        drop(stdin);
        if let Err(source) = write_result {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(RunnerError::Io {
                program: spec.program.clone(),
                source,
            });
        }
    }

    let stdout_task = tokio::spawn(stream_lines(stdout, tx.clone(), cancel.clone()));
    let stderr_task = tokio::spawn(stream_lines(stderr, tx, cancel.clone()));

    tokio::select! {
        status = child.wait() => {
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            let status = status.map_err(|source| RunnerError::Io {
                program: spec.program.clone(),
                source,
            })?;
            Ok(ExitStatusInfo { code: status.code(), cancelled: false })
        }
        () = cancel.cancelled() => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            Ok(ExitStatusInfo { code: None, cancelled: true })
        }
    }
}

async fn stream_lines<R>(reader: R, tx: mpsc::Sender<String>, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        tokio::select! {
            () = cancel.cancelled() => break,
            result = reader.read_until(b'\n', &mut buf) => {
                match result {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if buf.last() == Some(&b'\n') {
                            buf.pop();
                        }
                        if buf.len() > MAX_LINE_BYTES {
                            buf.truncate(MAX_LINE_BYTES);
                        }
                        let line = String::from_utf8_lossy(&buf).into_owned();
                        tokio::select! {
                            () = cancel.cancelled() => break,
                            send_result = tx.send(line) => {
                                if send_result.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
