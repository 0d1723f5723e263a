//! Frame codec over the raw response body.

use crate::stream::frame::{parse_frames, RawFrame, FRAME_DELIMITER};
use bytes::BytesMut;
use std::io;
use tokio_util::codec::Decoder;
use tracing::debug;

/// Cuts the response body into [`RawFrame`]s.
///
/// Frames are split on the delimiter bytes before any text decoding. The
/// delimiter is ASCII and never occurs inside a multi-byte character, so a
/// character split across network chunks is always whole again by the time
/// its frame is decoded. Invalid UTF-8 decodes to U+FFFD.
#[derive(Debug, Default)]
pub struct FrameCodec {
    // Where the delimiter search resumes in the buffered bytes
    next_index: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for FrameCodec {
    type Item = RawFrame;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<RawFrame>, io::Error> {
        let delimiter = FRAME_DELIMITER.as_bytes();

        loop {
            let Some(offset) = buf[self.next_index..]
                .windows(delimiter.len())
                .position(|window| window == delimiter)
            else {
                self.next_index = buf.len().saturating_sub(delimiter.len() - 1);
                return Ok(None);
            };

            let segment = buf.split_to(self.next_index + offset + delimiter.len());
            self.next_index = 0;

            let text = String::from_utf8_lossy(&segment);
            let (mut frames, _) = parse_frames(&text);
            if let Some(frame) = frames.pop() {
                return Ok(Some(frame));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<RawFrame>, io::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }

        if !buf.iter().all(u8::is_ascii_whitespace) {
            debug!(
                remainder = buf.len(),
                "discarding unterminated frame at end of stream"
            );
        }
        buf.clear();
        self.next_index = 0;
        Ok(None)
    }
}
