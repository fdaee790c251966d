//! Quote, escape and bracket aware scanning of parameter text.
//!
//! All delimiters the scanner cares about are ASCII, so the routines walk bytes and only ever
//! slice at ASCII positions. Multi-byte characters are stepped over one byte at a time; their
//! continuation bytes can never be mistaken for a delimiter.
//!
//! Every matcher returns `None` when its opening character is never closed. Callers treat that
//! conservatively: the remainder of the text is absorbed into the current span and the
//! expression parser gets to report the malformed literal.

/// Index of the quote closing the one at `start` (`"` or `'`). A backslash escapes the
/// following character.
pub fn scan_quotation(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let quote = *bytes.get(start)?;
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Index of the `)` matching the `(` at `start`.
pub fn scan_parenthesis(text: &str, start: usize) -> Option<usize> {
    scan_closing(text, start, b'(', b')')
}

/// Index of the `]` matching the `[` at `start`.
pub fn scan_bracket(text: &str, start: usize) -> Option<usize> {
    scan_closing(text, start, b'[', b']')
}

/// Index of the `}` matching the `{` at `start`.
pub fn scan_brace(text: &str, start: usize) -> Option<usize> {
    scan_closing(text, start, b'{', b'}')
}

fn scan_closing(text: &str, start: usize, open: u8, close: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&open) {
        return None;
    }

    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'"' | b'\'' => i = scan_quotation(text, i)?,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

enum Step {
    /// Plain character; inspect it, then move on by one byte.
    Plain,
    /// Escape, quotation or bracketed group; resume at this index.
    Resume(usize),
    /// An opener with no closer. Nothing after it can be a top-level separator.
    Unterminated,
}

fn step(text: &str, i: usize) -> Step {
    let found = match text.as_bytes()[i] {
        b'\\' => return Step::Resume(i + 2),
        b'"' | b'\'' => scan_quotation(text, i),
        b'(' => scan_parenthesis(text, i),
        b'[' => scan_bracket(text, i),
        b'{' => scan_brace(text, i),
        _ => return Step::Plain,
    };
    match found {
        Some(end) => Step::Resume(end + 1),
        None => Step::Unterminated,
    }
}

/// Whether `separator` occurs in `text` outside quotes, escapes and bracketed groups.
///
/// Unterminated quotes or brackets stop the scan and report `false`.
pub fn has_separator(text: &str, separator: char) -> bool {
    find_separator(text, 0, separator).is_some()
}

fn find_separator(text: &str, from: usize, separator: char) -> Option<usize> {
    debug_assert!(separator.is_ascii(), "separator must be ASCII: {separator:?}");
    let sep = separator as u8;
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == sep {
            return Some(i);
        }
        match step(text, i) {
            Step::Plain => i += 1,
            Step::Resume(next) => i = next,
            Step::Unterminated => return None,
        }
    }
    None
}

/// Splits text on a top-level separator using the same rules as [`has_separator`].
///
/// Empty tokens are kept, so `"a,,b"` yields `"a"`, `""`, `"b"` and `"a,"` yields `"a"`, `""`.
/// Tokens are not trimmed.
#[derive(Debug, Clone)]
pub struct ArgumentTokenizer<'a> {
    text: &'a str,
    separator: char,
    pos: usize,
    done: bool,
}

impl<'a> ArgumentTokenizer<'a> {
    pub fn new(text: &'a str, separator: char) -> Self {
        Self {
            text,
            separator,
            pos: 0,
            done: false,
        }
    }

    /// Next token together with its byte offset in the tokenized text.
    pub fn next_with_offset(&mut self) -> Option<(usize, &'a str)> {
        if self.done {
            return None;
        }
        let start = self.pos;
        let text = self.text;
        match find_separator(text, start, self.separator) {
            Some(end) => {
                self.pos = end + 1;
                Some((start, &text[start..end]))
            }
            None => {
                self.done = true;
                Some((start, &text[start..]))
            }
        }
    }
}

impl<'a> Iterator for ArgumentTokenizer<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.next_with_offset().map(|(_, token)| token)
    }
}
