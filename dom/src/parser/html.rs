use html_escape::decode_html_entities;

use crate::node::{Element, NodeId};
use crate::parser::error::ParseError;
use crate::parser::{RAW_TEXT_TAGS, VOID_TAGS};
use crate::tree::Dom;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build a DOM from an HTML fragment. Parsing stops at the first construct
/// left open at end of input.
pub(crate) fn parse_fragment(source: &str, file_id: usize) -> Result<Dom, Vec<ParseError>> {
    let mut state = ParseState::new(source, file_id);
    state.run();
    if state.errors.is_empty() {
        Ok(state.dom)
    } else {
        Err(state.errors)
    }
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState<'a> {
    source: &'a str,
    bytes: &'a [u8],
    file_id: usize,
    pos: usize,
    dom: Dom,
    /// Open elements, innermost last. The document root sits at index 0 and
    /// is never popped.
    stack: Vec<NodeId>,
    errors: Vec<ParseError>,
}

impl<'a> ParseState<'a> {
    fn new(source: &'a str, file_id: usize) -> Self {
        let dom = Dom::new();
        let root = dom.root();
        ParseState {
            source,
            bytes: source.as_bytes(),
            file_id,
            pos: 0,
            dom,
            stack: vec![root],
            errors: Vec::new(),
        }
    }

    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            let step = if self.starts_with(b"<!--") {
                self.comment()
            } else if self.starts_with(b"</") {
                self.end_tag()
            } else if self.starts_with(b"<!") || self.starts_with(b"<?") {
                self.declaration()
            } else if self.starts_with(b"<") && self.peek(1).is_some_and(|b| b.is_ascii_alphabetic()) {
                self.start_tag()
            } else {
                self.text();
                Ok(())
            };

            if let Err(error) = step {
                self.errors.push(error);
                return;
            }
        }
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.dom.root())
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.bytes[self.pos..].starts_with(prefix)
    }

    fn skip_ws(&mut self) {
        while self.peek(0).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn unclosed(&self, what: impl Into<String>, start: usize) -> ParseError {
        ParseError::error(what, start..self.bytes.len(), self.file_id)
    }

    // -----------------------------------------------------------------------
    // Markup
    // -----------------------------------------------------------------------

    fn comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        match find(self.bytes, self.pos + 4, b"-->") {
            Some(end) => {
                self.pos = end + 3;
                Ok(())
            }
            None => Err(self.unclosed("unclosed HTML comment", start)),
        }
    }

    /// `<!DOCTYPE ...>` and processing instructions carry nothing we keep.
    fn declaration(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        match find(self.bytes, self.pos + 2, b">") {
            Some(end) => {
                self.pos = end + 1;
                Ok(())
            }
            None => Err(self.unclosed("unclosed markup declaration", start)),
        }
    }

    fn tag_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':'))
        {
            self.pos += 1;
        }
        self.source[start..self.pos].to_ascii_lowercase()
    }

    fn end_tag(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 2;
        let name = self.tag_name();
        match find(self.bytes, self.pos, b">") {
            Some(end) => self.pos = end + 1,
            None => return Err(self.unclosed("unclosed end tag", start)),
        }

        // Close everything up to and including the nearest open element with
        // this name. A stray end tag closes nothing.
        let matched = self
            .stack
            .iter()
            .rposition(|id| self.dom.tag_name(*id) == Some(name.as_str()));
        if let Some(depth) = matched {
            self.stack.truncate(depth.max(1));
        }
        Ok(())
    }

    fn start_tag(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        let tag = self.tag_name();
        let mut attrs: Vec<(String, String)> = Vec::new();

        let self_closing = loop {
            self.skip_ws();
            match self.peek(0) {
                None => {
                    return Err(self.unclosed(format!("unclosed start tag <{}>", tag), start));
                }
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'/') if self.peek(1) == Some(b'>') => {
                    self.pos += 2;
                    break true;
                }
                Some(b'/') => self.pos += 1,
                Some(_) => {
                    // The first occurrence of a duplicated attribute wins.
                    if let Some((name, value)) = self.attribute()? {
                        if !attrs.iter().any(|(existing, _)| *existing == name) {
                            attrs.push((name, value));
                        }
                    }
                }
            }
        };

        let parent = self.current();
        let node = self
            .dom
            .create_element(parent, Element::new(tag.clone(), attrs, start..self.pos));

        if self_closing || VOID_TAGS.contains(&tag.as_str()) {
            return Ok(());
        }
        if RAW_TEXT_TAGS.contains(&tag.as_str()) {
            return self.raw_text(node, &tag, start);
        }
        self.stack.push(node);
        Ok(())
    }

    fn attribute(&mut self) -> Result<Option<(String, String)>, ParseError> {
        let source = self.source;
        let name_start = self.pos;
        while self
            .peek(0)
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
        {
            self.pos += 1;
        }
        if self.pos == name_start {
            // A stray '=' with no name in front of it.
            self.pos += 1;
            return Ok(None);
        }
        let name = source[name_start..self.pos].to_ascii_lowercase();

        self.skip_ws();
        if self.peek(0) != Some(b'=') {
            return Ok(Some((name, String::new())));
        }
        self.pos += 1;
        self.skip_ws();

        let value = match self.peek(0) {
            Some(quote @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                let Some(end) = find(self.bytes, value_start, &[quote]) else {
                    return Err(self
                        .unclosed("unclosed quoted attribute value", self.pos)
                        .with_note(format!("in attribute `{}`", name)));
                };
                self.pos = end + 1;
                &source[value_start..end]
            }
            _ => {
                let value_start = self.pos;
                while self
                    .peek(0)
                    .is_some_and(|b| !b.is_ascii_whitespace() && b != b'>')
                {
                    self.pos += 1;
                }
                &source[value_start..self.pos]
            }
        };

        Ok(Some((name, decode_html_entities(value).into_owned())))
    }

    fn raw_text(&mut self, node: NodeId, tag: &str, tag_start: usize) -> Result<(), ParseError> {
        let body_start = self.pos;
        let close = format!("</{}", tag);
        let Some(end) = find_ignore_case(self.bytes, body_start, close.as_bytes()) else {
            return Err(self.unclosed(format!("unclosed <{}> element", tag), tag_start));
        };
        if end > body_start {
            self.dom
                .create_text(node, &self.source[body_start..end]);
        }
        let Some(gt) = find(self.bytes, end, b">") else {
            return Err(self.unclosed("unclosed end tag", end));
        };
        self.pos = gt + 1;
        Ok(())
    }

    fn text(&mut self) {
        let start = self.pos;
        // The byte at `start` is either text or a '<' that opens no markup.
        self.pos += 1;
        while self.peek(0).is_some_and(|b| b != b'<') {
            self.pos += 1;
        }
        let raw = &self.source[start..self.pos];
        let parent = self.current();
        self.dom
            .create_text(parent, decode_html_entities(raw).into_owned());
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_ignore_case(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|offset| from + offset)
}
