//! The shared zlib inflate stream used for transport compression.
//!
//! With `compress=zlib-stream` every inbound binary frame is a chunk of one
//! long deflate stream; a gateway message is complete when a chunk ends with
//! the `00 00 FF FF` flush marker. The inflate context survives across
//! messages for the lifetime of a TCP connection and must be discarded on
//! reconnect.
use flate2::{Decompress, FlushDecompress, Status};

use glint_model::{Error, ErrorKind, Result};

/// The zlib sync-flush marker terminating each gateway message.
const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

pub struct Inflater {
    decompress: Decompress,
    /// Compressed chunks accumulated until the flush marker arrives.
    compressed: Vec<u8>,
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            decompress: Decompress::new(true),
            compressed: Vec::new(),
        }
    }

    /// Feeds one binary frame. Returns the decompressed message when the
    /// frame completes one, `None` while a message is still partial.
    pub fn push(&mut self, frame: &[u8]) -> Result<Option<String>> {
        self.compressed.extend_from_slice(frame);
        if self.compressed.len() < ZLIB_SUFFIX.len() || !self.compressed.ends_with(&ZLIB_SUFFIX) {
            return Ok(None);
        }

        let mut output = Vec::with_capacity((self.compressed.len() * 4).max(1024));
        let consumed_before = self.decompress.total_in();
        loop {
            let consumed = (self.decompress.total_in() - consumed_before) as usize;
            let status = self
                .decompress
                .decompress_vec(&self.compressed[consumed..], &mut output, FlushDecompress::Sync)
                .map_err(|e| {
                    Error::with_source(ErrorKind::Websocket, "gateway zlib stream corrupted", e)
                })?;
            let consumed = (self.decompress.total_in() - consumed_before) as usize;
            if consumed >= self.compressed.len() || status == Status::StreamEnd {
                break;
            }
            // Out of output room; grow and continue.
            output.reserve(8192);
        }
        self.compressed.clear();

        String::from_utf8(output)
            .map(Some)
            .map_err(|e| Error::with_source(ErrorKind::Websocket, "inflated frame is not UTF-8", e))
    }

    /// Discards all stream state. Required when the TCP connection changes.
    pub fn reset(&mut self) {
        self.decompress.reset(true);
        self.compressed.clear();
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compress, Compression, FlushCompress};

    /// Compresses `messages` the way the gateway does: one shared deflate
    /// stream, each message terminated by a sync flush.
    fn zlib_stream(messages: &[&str]) -> Vec<Vec<u8>> {
        let mut compress = Compress::new(Compression::default(), true);
        messages
            .iter()
            .map(|message| {
                let mut frame = Vec::with_capacity(message.len() + 1024);
                compress
                    .compress_vec(message.as_bytes(), &mut frame, FlushCompress::Sync)
                    .unwrap();
                assert!(frame.ends_with(&[0x00, 0x00, 0xFF, 0xFF]));
                frame
            })
            .collect()
    }

    #[test]
    fn reassembles_messages_across_a_shared_stream() {
        let frames = zlib_stream(&[r#"{"op":10}"#, r#"{"op":11}"#]);
        let mut inflater = Inflater::new();

        let first = inflater.push(&frames[0]).unwrap();
        assert_eq!(first.as_deref(), Some(r#"{"op":10}"#));
        let second = inflater.push(&frames[1]).unwrap();
        assert_eq!(second.as_deref(), Some(r#"{"op":11}"#));
    }

    #[test]
    fn buffers_partial_frames_until_the_marker() {
        let frames = zlib_stream(&[r#"{"op":10,"d":{"heartbeat_interval":45000}}"#]);
        let frame = &frames[0];
        let (head, tail) = frame.split_at(frame.len() / 2);

        let mut inflater = Inflater::new();
        assert_eq!(inflater.push(head).unwrap(), None);
        assert_eq!(
            inflater.push(tail).unwrap().as_deref(),
            Some(r#"{"op":10,"d":{"heartbeat_interval":45000}}"#)
        );
    }

    #[test]
    fn reset_discards_stream_state() {
        let mut inflater = Inflater::new();
        let frames = zlib_stream(&[r#"{"op":10}"#]);
        assert!(inflater.push(&frames[0]).unwrap().is_some());

        inflater.reset();
        // a fresh stream from a new connection inflates cleanly
        let frames = zlib_stream(&[r#"{"op":0}"#]);
        assert_eq!(inflater.push(&frames[0]).unwrap().as_deref(), Some(r#"{"op":0}"#));
    }
}
