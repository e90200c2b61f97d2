//! Incremental extraction of `"text":"..."` fields from a growing response
//! body.
//!
//! The model endpoint streams its body as a sequence of JSON fragments whose
//! framing is not worth trusting; the only stable anchor is that every piece
//! of generated text appears as a `text` field with a JSON-string value. The
//! scanner therefore never tries to parse whole documents: it holds the body
//! received so far plus an offset below which no new match can start, and on
//! each growth scans only from that offset. A field cut off at the tail of
//! the buffer matches nothing this round and is rescanned once more bytes
//! arrive.

/// Explicit scanner state over the growing body buffer.
#[derive(Debug, Default)]
pub struct DeltaScanner {
    buf: Vec<u8>,
    consumed: usize,
}

enum FieldMatch {
    /// Complete quoted value; byte range includes both quotes.
    Complete { value_start: usize, value_end: usize },
    /// Ran off the end of the buffer mid-field; retry on the next growth.
    Partial,
    /// `"text"` not followed by a quoted string value; resume scanning here.
    NoMatch { resume: usize },
}

impl DeltaScanner {
    const NEEDLE: &'static [u8] = b"\"text\"";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly received body bytes and return every text delta whose
    /// field is now complete, in the order the fields appear.
    ///
    /// `consumed` advances past everything that can no longer begin a match:
    /// complete fields, regions with no field name in them, and occurrences
    /// that turned out not to be a string-valued field. Only a field cut off
    /// at the tail (and the last few bytes, which may be a cut-off field
    /// name) stay unconsumed for the next growth.
    pub fn push_chunk(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut deltas = Vec::new();
        let mut pos = self.consumed;
        loop {
            let Some(offset) = find(&self.buf[pos..], Self::NEEDLE) else {
                let tail = self.buf.len().saturating_sub(Self::NEEDLE.len() - 1);
                self.consumed = pos.max(tail);
                break;
            };
            let name_start = pos + offset;
            match self.match_value(name_start + Self::NEEDLE.len()) {
                FieldMatch::Complete {
                    value_start,
                    value_end,
                } => {
                    deltas.push(self.decode(value_start, value_end));
                    pos = value_end;
                    self.consumed = value_end;
                }
                FieldMatch::Partial => {
                    self.consumed = name_start;
                    break;
                }
                FieldMatch::NoMatch { resume } => {
                    pos = resume;
                    self.consumed = resume;
                }
            }
        }
        deltas
    }

    /// Match `: "<value>"` starting right after the field name, honoring
    /// backslash escapes inside the value.
    fn match_value(&self, mut pos: usize) -> FieldMatch {
        pos = self.skip_whitespace(pos);
        match self.buf.get(pos) {
            None => return FieldMatch::Partial,
            Some(b':') => pos += 1,
            Some(_) => return FieldMatch::NoMatch { resume: pos },
        }

        pos = self.skip_whitespace(pos);
        match self.buf.get(pos) {
            None => return FieldMatch::Partial,
            Some(b'"') => {}
            Some(_) => return FieldMatch::NoMatch { resume: pos },
        }

        let value_start = pos;
        let mut escaped = false;
        for (index, byte) in self.buf.iter().enumerate().skip(value_start + 1) {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                return FieldMatch::Complete {
                    value_start,
                    value_end: index + 1,
                };
            }
        }
        FieldMatch::Partial
    }

    fn skip_whitespace(&self, mut pos: usize) -> usize {
        while matches!(self.buf.get(pos), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            pos += 1;
        }
        pos
    }

    /// Decode the quoted value with JSON string-escape rules, falling back to
    /// the raw match when the payload is not a valid JSON string.
    fn decode(&self, value_start: usize, value_end: usize) -> String {
        let quoted = &self.buf[value_start..value_end];
        serde_json::from_slice::<String>(quoted).unwrap_or_else(|_| {
            String::from_utf8_lossy(&quoted[1..quoted.len() - 1]).into_owned()
        })
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
