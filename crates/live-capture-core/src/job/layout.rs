use crate::{CaptureError, CoreResult};

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use tracing::debug;

/// Turn a job name into a single safe path component.
pub(crate) fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "job".to_string(),
        _ => cleaned,
    }
}

/// Create `<root>/<name>/<YYYYmmdd-HHMMSS>` for one recording session.
///
/// Parents are created idempotently. The session directory itself must be
/// new; on collision a numeric suffix is appended.
pub(crate) fn create_session_dir(
    root: &Path,
    job_name: &str,
    started_at: DateTime<Local>,
) -> CoreResult<PathBuf> {
    let base = root.join(sanitize_component(job_name));
    fs::create_dir_all(&base)?;

    let stamp = started_at.format("%Y%m%d-%H%M%S").to_string();
    let mut attempt = 1u32;

    loop {
        let candidate = if attempt == 1 {
            base.join(&stamp)
        } else {
            base.join(format!("{}-{}", stamp, attempt))
        };

        match fs::create_dir(&candidate) {
            Ok(()) => {
                debug!(session_dir = ?candidate, "Session directory created");
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(CaptureError::from(e)),
        }
    }
}
