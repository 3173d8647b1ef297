use crate::{LineSink, LogPump, MAX_LINE_BYTES};

use std::{
    io::Cursor,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{io::AsyncWriteExt, sync::Notify};

#[derive(Default)]
struct RecordingSink {
    lines: Mutex<Vec<(String, String)>>,
}

impl LineSink for RecordingSink {
    #[allow(clippy::unwrap_used)]
    fn accept(&self, prefix: &str, line: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((prefix.to_string(), line.to_string()));
    }
}

/// WHAT: Empty and whitespace-only lines are not forwarded
/// WHY: ffmpeg and streamlink emit blank progress lines that only add noise
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_output_with_blank_lines_when_pumping_then_only_content_forwarded() {
    // Given: Output mixing content, blank lines and trailing whitespace
    let source = Cursor::new(b"first\n\n   \nsecond  \r\nthird".to_vec());
    let sink = Arc::new(RecordingSink::default());

    // When: Pumping it to completion
    let forwarded = LogPump::spawn(source, "fetcher:demo".to_string(), sink.clone(), None)
        .await
        .unwrap();

    // Then: Three trimmed lines arrive in order with the prefix
    assert_eq!(forwarded, 3);
    let lines = sink.lines.lock().unwrap().clone();
    assert_eq!(
        lines,
        vec![
            ("fetcher:demo".to_string(), "first".to_string()),
            ("fetcher:demo".to_string(), "second".to_string()),
            ("fetcher:demo".to_string(), "third".to_string()),
        ]
    );
}

/// WHAT: Invalid UTF-8 is replaced instead of ending the pump
/// WHY: A single garbled byte must not stop log draining and block the child
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_invalid_utf8_when_pumping_then_line_forwarded_lossily() {
    // Given: A line containing an invalid byte, followed by a valid one
    let source = Cursor::new(b"bad \xff byte\nok\n".to_vec());
    let sink = Arc::new(RecordingSink::default());

    // When: Pumping it
    let forwarded = LogPump::spawn(source, "segmenter:demo".to_string(), sink.clone(), None)
        .await
        .unwrap();

    // Then: Both lines arrive
    assert_eq!(forwarded, 2);
    let lines = sink.lines.lock().unwrap().clone();
    assert!(lines[0].1.starts_with("bad "));
    assert_eq!(lines[1].1, "ok");
}

/// WHAT: Closing the stream notifies the owner
/// WHY: The exit watcher wakes on pipe closure instead of waiting a full interval
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_on_close_notify_when_writer_closes_then_notified() {
    // Given: A duplex pipe feeding a pump with a close notification
    let (mut writer, reader) = tokio::io::duplex(64);
    let sink = Arc::new(RecordingSink::default());
    let closed = Arc::new(Notify::new());
    let pump = LogPump::spawn(
        reader,
        "fetcher:demo".to_string(),
        sink.clone(),
        Some(Arc::clone(&closed)),
    );

    // When: Writing a line and closing the writer
    writer.write_all(b"hello\n").await.unwrap();
    drop(writer);

    // Then: The notification fires and the pump reports one line
    tokio::time::timeout(Duration::from_secs(1), closed.notified())
        .await
        .unwrap();
    assert_eq!(pump.await.unwrap(), 1);
}

/// WHAT: Carriage returns end lines just like newlines
/// WHY: ffmpeg rewrites its progress line with a bare \r; it must arrive as it happens
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_carriage_return_progress_when_pumping_then_one_line_per_update() {
    // Given: Three progress updates separated only by \r
    let source = Cursor::new(b"frame=1 size=1kB\rframe=2 size=2kB\rframe=3 size=3kB\r".to_vec());
    let sink = Arc::new(RecordingSink::default());

    // When: Pumping it
    let forwarded = LogPump::spawn(source, "segmenter:demo".to_string(), sink.clone(), None)
        .await
        .unwrap();

    // Then: Each update is its own line
    assert_eq!(forwarded, 3);
    let lines: Vec<String> = sink
        .lines
        .lock()
        .unwrap()
        .iter()
        .map(|(_, line)| line.clone())
        .collect();
    assert_eq!(
        lines,
        vec!["frame=1 size=1kB", "frame=2 size=2kB", "frame=3 size=3kB"]
    );
}

/// WHAT: A line with no terminator is forwarded in bounded pieces
/// WHY: A child that never prints a newline must not grow the buffer without limit
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_unterminated_output_when_pumping_then_split_at_max_line_length() {
    // Given: Two and a half maximum-length lines without any terminator
    let source = Cursor::new(vec![b'x'; MAX_LINE_BYTES * 2 + MAX_LINE_BYTES / 2]);
    let sink = Arc::new(RecordingSink::default());

    // When: Pumping it
    let forwarded = LogPump::spawn(source, "fetcher:demo".to_string(), sink.clone(), None)
        .await
        .unwrap();

    // Then: No piece exceeds the limit and nothing is lost
    assert_eq!(forwarded, 3);
    let lines = sink.lines.lock().unwrap().clone();
    assert!(lines.iter().all(|(_, line)| line.len() <= MAX_LINE_BYTES));
    let total: usize = lines.iter().map(|(_, line)| line.len()).sum();
    assert_eq!(total, MAX_LINE_BYTES * 2 + MAX_LINE_BYTES / 2);
}

/// WHAT: Progress lines are delivered while the writer is still open
/// WHY: Diagnostics must not wait for the child to exit
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_open_stream_when_progress_written_then_forwarded_before_close() {
    // Given: A duplex pipe feeding a pump
    let (mut writer, reader) = tokio::io::duplex(64);
    let sink = Arc::new(RecordingSink::default());
    let pump = LogPump::spawn(reader, "segmenter:demo".to_string(), sink.clone(), None);

    // When: Writing one \r-terminated update and waiting without closing
    writer.write_all(b"frame=1\r").await.unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while sink.lines.lock().unwrap().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Then: The update already reached the sink
    assert_eq!(sink.lines.lock().unwrap().len(), 1);
    drop(writer);
    assert_eq!(pump.await.unwrap(), 1);
}
