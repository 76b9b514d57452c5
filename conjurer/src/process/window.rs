//! Incremental decoding of process output and the bounded tail shown as status

/// Most recent bytes considered for the status tail
pub const TAIL_BYTES: usize = 1500;

/// Most recent lines kept in the status tail
pub const TAIL_LINES: usize = 10;

/// Accumulates raw output bytes into text.
///
/// Multi-byte sequences split across reads are held back until the rest
/// arrives; bytes that can never form valid UTF-8 become U+FFFD.
#[derive(Debug, Default)]
pub struct OutputWindow {
    pending: Vec<u8>,
    decoded: String,
}

impl OutputWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes. Returns true when new characters were decoded.
    pub fn push(&mut self, bytes: &[u8]) -> bool {
        self.pending.extend_from_slice(bytes);
        let before = self.decoded.len();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.decoded.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    // Valid prefix is guaranteed by `valid_up_to`
                    self.decoded
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        Some(bad) => {
                            self.decoded.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            // Incomplete sequence at the end, wait for more bytes
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        self.decoded.len() > before
    }

    /// Flush whatever is still pending as replacement characters
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            self.decoded.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
    }

    /// Everything decoded so far
    pub fn text(&self) -> &str {
        &self.decoded
    }

    pub fn into_text(mut self) -> String {
        self.finish();
        self.decoded
    }

    /// Last [`TAIL_LINES`] lines within the last [`TAIL_BYTES`] bytes, with
    /// carriage returns removed
    pub fn tail(&self) -> String {
        last_lines(&self.decoded, TAIL_BYTES, TAIL_LINES)
    }
}

/// Bounded tail of `text`: the last `max_bytes` (moved forward to a char
/// boundary), then the last `max_lines` lines of that, line endings kept.
pub fn last_lines(text: &str, max_bytes: usize, max_lines: usize) -> String {
    let mut start = text.len().saturating_sub(max_bytes);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    let chunk = &text[start..];

    let lines: Vec<&str> = chunk.split_inclusive('\n').collect();
    let skip = lines.len().saturating_sub(max_lines);
    lines[skip..].concat().replace('\r', "")
}
