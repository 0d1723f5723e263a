//! Frame parser for the `event: <name>\ndata: <json>\n\n` stream format.
//!
//! Parsing is a pure function over a text buffer. The caller owns the
//! accumulated text and threads the returned remainder into the next call.

use tracing::debug;

/// Blank line separating two frames.
pub const FRAME_DELIMITER: &str = "\n\n";

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";

/// One `event`/`data` unit recovered from the stream, payload not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub event: String,
    pub data: String,
}

/// Split `buffer` into complete frames and the unconsumed remainder.
///
/// Delimiters are matched left to right, so a run of three or more newlines
/// ends the frame at its first blank line and the extra newlines start the
/// next segment. The text after the last delimiter is always returned as the
/// remainder,
/// even when it looks like a complete frame: more bytes of it may still be
/// in flight. Complete segments that lack an event line or a data line are
/// dropped.
///
/// # Example
///
/// ```
/// use rk_core::stream::frame::parse_frames;
///
/// let (frames, rest) = parse_frames("event: progress\ndata: {}\n\nevent: rep");
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].event, "progress");
/// assert_eq!(rest, "event: rep");
/// ```
pub fn parse_frames(buffer: &str) -> (Vec<RawFrame>, &str) {
    let mut frames = Vec::new();
    let mut rest = buffer;

    while let Some((segment, tail)) = rest.split_once(FRAME_DELIMITER) {
        match parse_segment(segment) {
            Some(frame) => frames.push(frame),
            None if !segment.trim().is_empty() => debug!(segment, "dropping malformed frame"),
            None => {}
        }
        rest = tail;
    }

    (frames, rest)
}

/// Match one complete segment against the event line and the data line.
///
/// The data runs from the data line to the end of the segment and may span
/// several lines.
fn parse_segment(segment: &str) -> Option<RawFrame> {
    let event = segment
        .lines()
        .find_map(|line| line.strip_prefix(EVENT_PREFIX))
        .map(str::trim)
        .filter(|name| !name.is_empty())?;

    let data_start = line_offsets(segment)
        .find(|&offset| segment[offset..].starts_with(DATA_PREFIX))?;
    let data = &segment[data_start + DATA_PREFIX.len()..];
    let data = data.strip_prefix(' ').unwrap_or(data).trim_end_matches('\r');

    if data.trim().is_empty() {
        return None;
    }

    Some(RawFrame {
        event: event.to_string(),
        data: data.to_string(),
    })
}

/// Byte offsets at which each line of `text` starts.
fn line_offsets(text: &str) -> impl Iterator<Item = usize> + '_ {
    std::iter::once(0).chain(text.match_indices('\n').map(|(index, _)| index + 1))
}
