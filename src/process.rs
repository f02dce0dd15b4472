//! Running one external tool with a deadline.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::SearchError;
use crate::hit::RawHit;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run `cmd` to completion or until `timeout` elapses.
///
/// `accepted` lists the exit codes whose stdout is trusted (usually `[0]`).
/// Output is decoded permissively: invalid UTF-8 becomes U+FFFD rather than
/// failing the call. A timed-out child is killed and reaped; nothing is
/// retried.
pub(crate) fn run(
    mut cmd: Command,
    timeout: Duration,
    accepted: &[i32],
) -> Result<Vec<RawHit>, SearchError> {
    let program = cmd.get_program().to_string_lossy().into_owned();

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|source| SearchError::ToolSpawn {
        program: program.clone(),
        source,
    })?;

    // Drain stdout on a side thread so a chatty child never blocks on a
    // full pipe while we poll for exit.
    let stdout = child.stdout.take();
    let reader = thread::spawn(move || drain(stdout));

    let status = match wait_deadline(&mut child, timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            // A grandchild may still hold the pipe open; leave the reader
            // detached rather than block past the deadline.
            drop(reader);
            return Err(SearchError::ToolTimeout { program, timeout });
        }
        Err(source) => {
            let _ = child.kill();
            let _ = child.wait();
            drop(reader);
            return Err(SearchError::Io {
                path: program.into(),
                source,
            });
        }
    };

    let bytes = reader
        .join()
        .map_err(|_| SearchError::ThreadPool("stdout reader panicked".into()))?
        .map_err(|source| read_error(&program, source))?;

    match status.code() {
        Some(code) if accepted.contains(&code) => {
            debug!(%program, code, bytes = bytes.len(), "tool finished");
            Ok(parse_lines(&bytes))
        }
        code => Err(SearchError::ToolExit { program, code }),
    }
}

/// Read a pipe to the end. A missing pipe reads as empty.
fn drain<R: Read>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut out) = pipe {
        out.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

/// A failed stdout read means the output may be truncated; the call is
/// failed rather than trusted.
fn read_error(program: &str, source: std::io::Error) -> SearchError {
    SearchError::Io {
        path: program.into(),
        source,
    }
}

fn wait_deadline(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Split tool output into trimmed, non-empty lines.
pub(crate) fn parse_lines(bytes: &[u8]) -> Vec<RawHit> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(RawHit::from)
        .collect()
}
