use serde_json::Value;

/// Completion state of an accumulating argument buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferState {
    /// More fragments are needed before the document can close.
    Incomplete,
    /// Nesting is balanced; a full parse is worth attempting.
    Balanced,
    /// The buffer can no longer become valid JSON (unbalanced close or
    /// trailing bytes after a complete document).
    Invalid,
}

/// Incremental accumulator for streamed tool-call argument JSON.
///
/// Tracks brace/bracket depth and string/escape state per pushed fragment so
/// completion is detected without reparsing the whole buffer on every delta.
/// `parse` is the authoritative check and is only called once the scanner
/// reports `Balanced` (or at finalization).
#[derive(Debug, Default)]
pub struct ArgumentBuffer {
    raw: String,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// First significant byte opened a structural or string document.
    opened: bool,
    /// First significant byte started a bare scalar (never Balanced; left to
    /// the full parse at finalization).
    scalar: bool,
    invalid: bool,
}

impl ArgumentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) {
        for c in fragment.chars() {
            self.scan(c);
        }
        self.raw.push_str(fragment);
    }

    fn scan(&mut self, c: char) {
        if self.invalid || self.scalar {
            return;
        }
        if self.escaped {
            self.escaped = false;
            return;
        }
        if self.in_string {
            match c {
                '\\' => self.escaped = true,
                '"' => self.in_string = false,
                _ => {}
            }
            return;
        }
        if c.is_whitespace() {
            return;
        }
        if self.opened && self.depth == 0 {
            // Bytes after a complete document
            self.invalid = true;
            return;
        }
        match c {
            '{' | '[' => {
                self.opened = true;
                self.depth += 1;
            }
            '}' | ']' => {
                if self.depth == 0 {
                    self.invalid = true;
                } else {
                    self.depth -= 1;
                }
            }
            '"' => {
                self.opened = true;
                self.in_string = true;
            }
            _ => {
                if !self.opened {
                    self.scalar = true;
                }
            }
        }
    }

    pub fn state(&self) -> BufferState {
        if self.invalid {
            BufferState::Invalid
        } else if self.opened && self.depth == 0 && !self.in_string {
            BufferState::Balanced
        } else {
            BufferState::Incomplete
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Full parse of the accumulated buffer.
    pub fn parse(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.raw)
    }
}
