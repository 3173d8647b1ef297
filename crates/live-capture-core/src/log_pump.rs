//! Line-by-line draining of child process output.

use std::sync::Arc;

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    sync::Notify,
    task::JoinHandle,
};
use tracing::{debug, info};

/// Destination for lines read from a child process.
pub trait LineSink: Send + Sync {
    /// Accept one non-empty, trimmed line tagged with its source prefix.
    fn accept(&self, prefix: &str, line: &str);
}

/// Forwards child output into the `tracing` pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LineSink for TracingSink {
    fn accept(&self, prefix: &str, line: &str) {
        info!(source = %prefix, "{}", line);
    }
}

/// Longest line forwarded in one piece; longer runs are split.
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// Background reader that forwards a stream to a [`LineSink`].
pub struct LogPump;

impl LogPump {
    /// Spawn a task draining `source` until end-of-stream.
    ///
    /// Lines end at `\n` or `\r` (ffmpeg rewrites its progress line with a
    /// bare carriage return), so progress output is forwarded as it arrives.
    /// A line longer than [`MAX_LINE_BYTES`] is forwarded in pieces. Empty
    /// lines are skipped and invalid UTF-8 is replaced. When the stream
    /// closes, `on_close` (if any) is notified; an owning job uses this to
    /// notice a child exiting. The task resolves to the number of lines
    /// forwarded.
    pub fn spawn<R>(
        source: R,
        prefix: String,
        sink: Arc<dyn LineSink>,
        on_close: Option<Arc<Notify>>,
    ) -> JoinHandle<u64>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut reader = BufReader::new(source);
            let mut line = Vec::with_capacity(256);
            let mut forwarded = 0u64;

            loop {
                let chunk = match reader.fill_buf().await {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        debug!(source = %prefix, error = ?e, "Log stream read failed");
                        break;
                    }
                };
                if chunk.is_empty() {
                    break;
                }

                let consumed = chunk.len();
                for &byte in chunk {
                    if byte == b'\n' || byte == b'\r' {
                        forwarded += forward(sink.as_ref(), &prefix, &mut line);
                    } else {
                        line.push(byte);
                        if line.len() >= MAX_LINE_BYTES {
                            forwarded += forward(sink.as_ref(), &prefix, &mut line);
                        }
                    }
                }
                reader.consume(consumed);
            }

            forwarded += forward(sink.as_ref(), &prefix, &mut line);

            debug!(source = %prefix, lines = forwarded, "Log stream closed");

            if let Some(notify) = on_close {
                notify.notify_one();
            }

            forwarded
        })
    }
}

/// Send the buffered line if it has content, then clear it.
fn forward(sink: &dyn LineSink, prefix: &str, line: &mut Vec<u8>) -> u64 {
    let sent = {
        let text = String::from_utf8_lossy(line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            0
        } else {
            sink.accept(prefix, trimmed);
            1
        }
    };
    line.clear();
    sent
}
