//! Incremental SSE frame decoder
//!
//! Recovers blank-line-delimited event frames from a chunked text stream.
//! Only `data:` lines carry payload; comments and other fields are
//! ignored. The decoder keeps the trailing incomplete line and the frame
//! in progress across calls, so frames may arrive split at arbitrary
//! chunk boundaries.

/// Stateful SSE frame decoder.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    /// Carry-over tail: bytes after the last complete line
    buf: String,

    /// `data:` lines of the frame currently being assembled
    data_lines: Vec<String>,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every frame payload completed by it, in
    /// arrival order.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buf.push_str(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=pos).collect();
            let line = line.trim_end_matches('\n').trim_end_matches('\r');

            if line.is_empty() {
                if !self.data_lines.is_empty() {
                    frames.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            if let Some(rest) = line.strip_prefix("data:") {
                self.data_lines.push(rest.trim_start().to_string());
            }
        }

        frames
    }
}
