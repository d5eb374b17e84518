//! ffprobe JSON output parsing.

use std::path::Path;

use serde_json::Value;

use super::types::{MediaInfo, StreamInfo, StreamKind, TranscodeError, TranscodeResult};

/// Arguments for `ffprobe` returning container and stream metadata as JSON.
pub const PROBE_ARGS: [&str; 7] = [
    "-v",
    "error",
    "-show_format",
    "-show_streams",
    "-of",
    "json",
    "-hide_banner",
];

/// Parse `ffprobe -show_format -show_streams -of json` output.
///
/// ffprobe reports durations as strings; `N/A` and missing values become
/// `None`.
pub fn parse_probe_json(json: &str, path: &Path) -> TranscodeResult<MediaInfo> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| TranscodeError::parse("ffprobe", path, e.to_string()))?;

    let format = value.get("format");
    if format.is_none() && value.get("streams").is_none() {
        return Err(TranscodeError::parse(
            "ffprobe",
            path,
            "no format or stream information",
        ));
    }

    let duration_secs = format
        .and_then(|f| f.get("duration"))
        .and_then(parse_seconds);

    let streams = value
        .get("streams")
        .and_then(|s| s.as_array())
        .map(|streams| {
            streams
                .iter()
                .enumerate()
                .map(|(position, stream)| StreamInfo {
                    index: stream
                        .get("index")
                        .and_then(|i| i.as_u64())
                        .map(|i| i as usize)
                        .unwrap_or(position),
                    kind: StreamKind::from_codec_type(
                        stream
                            .get("codec_type")
                            .and_then(|v| v.as_str())
                            .unwrap_or(""),
                    ),
                    codec: stream
                        .get("codec_name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    duration_secs: stream.get("duration").and_then(parse_seconds),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(MediaInfo {
        duration_secs,
        streams,
    })
}

/// Accept both `"12.5"` and `12.5`.
fn parse_seconds(value: &Value) -> Option<f64> {
    let secs = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    secs.is_finite().then_some(secs)
}
