use crate::logrotate::ServiceLog;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncRead;
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};

/// Which output stream of a service process a forwarder is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Shared accumulation buffer for one output stream, readable through
/// `ProcessHandle::captured_stdout`/`captured_stderr` while forwarding tasks
/// keep writing to it. Holds at most the last `CAPTURE_MAX_BYTES` of output;
/// the persistent server streams for the whole application session.
pub type CaptureBuffer = Arc<Mutex<String>>;

/// Upper bound on a capture buffer; older output is dropped past this
pub const CAPTURE_MAX_BYTES: usize = 64 * 1024;

/// Longest single line the forwarder accepts; a newline-free run past this
/// is dropped like any other decode error
const MAX_LINE_BYTES: usize = 16 * 1024;

pub fn capture_buffer() -> CaptureBuffer {
    Arc::new(Mutex::new(String::new()))
}

/// Forward a process output stream line by line into the service log
/// (stdout at info, stderr at error level) while accumulating the tail of
/// the raw text for later diagnostics. Runs until the stream reaches EOF,
/// then logs the stream end for streaming services.
pub async fn forward_lines<R: AsyncRead + Unpin>(
    io: R,
    kind: StreamKind,
    log: ServiceLog,
    capture: CaptureBuffer,
) {
    let mut frames = FramedRead::new(io, LinesCodec::new_with_max_length(MAX_LINE_BYTES));

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(line) => {
                match kind {
                    StreamKind::Stdout => log.info(&format!("stdout: {line}")),
                    StreamKind::Stderr => log.error(&format!("stderr: {line}")),
                }
                let mut buffer = capture.lock().unwrap_or_else(|p| p.into_inner());
                buffer.push_str(&line);
                buffer.push('\n');
                if buffer.len() > CAPTURE_MAX_BYTES {
                    let mut cut = buffer.len() - CAPTURE_MAX_BYTES;
                    while !buffer.is_char_boundary(cut) {
                        cut += 1;
                    }
                    buffer.drain(..cut);
                }
            }
            Err(e) => {
                log.error(&format!("stream decode error: {e}"));
                break;
            }
        }
    }

    if kind == StreamKind::Stdout {
        log.info("service process exited");
    }
}
