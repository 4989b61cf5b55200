//! Push progress rendering
//!
//! The image engine reports push progress as newline-delimited JSON
//! objects. Lines carrying both `id` and `status` are rendered as
//! `ID: <id>, Status: <status>[, Progress: <progress>]`; any other
//! object is skipped. A line that is not a JSON object is an error.
//!
//! The engine answers a failed upload with a successful response and
//! reports the failure in the stream as an `error`/`errorDetail`
//! object. Both the rendered and the drained paths turn that into
//! [`CanvosError::PushFailed`].

use futures::StreamExt;
use serde_json::{Map, Value};
use std::io::Write;

use super::ProgressStream;
use crate::error::{CanvosError, Result};

/// Render one decoded progress object, if it has something to show
pub fn render_progress_line(detail: &Map<String, Value>) -> Option<String> {
    let id = detail.get("id").and_then(Value::as_str)?;
    let status = detail.get("status").and_then(Value::as_str)?;

    Some(match detail.get("progress").and_then(Value::as_str) {
        Some(progress) => format!("ID: {id}, Status: {status}, Progress: {progress}"),
        None => format!("ID: {id}, Status: {status}"),
    })
}

/// Error message reported inside a progress object
pub fn progress_error(detail: &Map<String, Value>) -> Option<String> {
    if let Some(error) = detail.get("error") {
        return Some(match error.as_str() {
            Some(message) => message.to_string(),
            None => error.to_string(),
        });
    }

    let error_detail = detail.get("errorDetail")?;
    Some(
        error_detail
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error_detail.to_string()),
    )
}

fn check_error(image: &str, detail: &Map<String, Value>) -> Result<()> {
    match progress_error(detail) {
        Some(message) => Err(CanvosError::PushFailed {
            image: image.to_string(),
            message,
        }),
        None => Ok(()),
    }
}

fn render_line<W: Write + ?Sized>(image: &str, line: &[u8], sink: &mut W) -> Result<()> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }

    let detail: Map<String, Value> =
        serde_json::from_str(text).map_err(|source| CanvosError::ProgressStream {
            line: text.to_string(),
            source,
        })?;

    check_error(image, &detail)?;

    if let Some(rendered) = render_progress_line(&detail) {
        writeln!(sink, "{rendered}").map_err(|e| CanvosError::io("write", "push progress", e))?;
    }

    Ok(())
}

fn inspect_line(image: &str, line: &[u8]) -> Result<()> {
    match serde_json::from_slice::<Map<String, Value>>(line.trim_ascii()) {
        Ok(detail) => check_error(image, &detail),
        Err(_) => Ok(()),
    }
}

/// Split complete lines off the front of `buffer`
fn take_lines(buffer: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
        lines.push(buffer.drain(..=newline).collect());
    }
    lines
}

/// Decode the progress of `image` to the end, rendering each line to `sink`
pub async fn decode_progress<W: Write + ?Sized>(
    image: &str,
    mut stream: ProgressStream,
    sink: &mut W,
) -> Result<()> {
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
        for line in take_lines(&mut buffer) {
            render_line(image, &line, sink)?;
        }
    }

    render_line(image, &buffer, sink)
}

/// Consume the progress of `image` without rendering it.
///
/// Lines that do not decode are ignored; reported errors are not.
pub async fn drain_progress(image: &str, mut stream: ProgressStream) -> Result<()> {
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
        for line in take_lines(&mut buffer) {
            inspect_line(image, &line)?;
        }
    }

    inspect_line(image, &buffer)
}
