pub mod error;
mod html;

pub use error::ParseError;

use crate::tree::Dom;

/// Elements that never have content or an end tag.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose body is kept verbatim: no nested markup, no character references.
pub const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse an HTML fragment into a DOM rooted at a document node.
    pub fn parse(&self) -> Result<Dom, Vec<ParseError>> {
        let mut dom = html::parse_fragment(&self.source, self.file_id)?;
        dom.source_id = self.file_id;
        Ok(dom)
    }
}
