//! # saxoxide
//!
//! A streaming, push-based, event-driven XML/HTML parser. Feed the parser
//! consecutive chunks of bytes or text and it fires SAX-style handler
//! events — tag opens, tag closes, attributes, text runs, comments, CDATA
//! sections, processing instructions, doctype declarations, and errors —
//! without ever materializing a document tree.
//!
//! Two fidelity modes are supported (strict XML and lenient HTML-like),
//! along with optional XML-namespace resolution, case normalization of
//! names, whitespace handling of text, and in-stream entity expansion from
//! the predefined XML set, an extended HTML named set, numeric character
//! references, and application-supplied definitions.
//!
//! ## Quick Start
//!
//! ```
//! use saxoxide::{ParserOptions, SaxHandler, SaxParser};
//!
//! #[derive(Default)]
//! struct TextCollector {
//!     text: String,
//! }
//!
//! impl SaxHandler for TextCollector {
//!     fn on_text(&mut self, text: &str) {
//!         self.text.push_str(text);
//!     }
//! }
//!
//! let mut parser = SaxParser::new(ParserOptions::default(), TextCollector::default());
//! parser.write(b"<greeting>Hello, ").unwrap();
//! parser.write(b"world!</greeting>").unwrap();
//! parser.end().unwrap();
//! assert_eq!(parser.handler().text, "Hello, world!");
//! ```

#![forbid(unsafe_code)]

pub mod entities;
pub mod error;
pub mod parser;
pub mod sax;

// Re-export primary types at the crate root for convenience.
pub use entities::{define_entity, defined_entity};
pub use error::{ErrorSeverity, ParseDiagnostic, ParseError, SourceLocation};
pub use parser::{CaseTransform, ParserOptions, SaxParser};
pub use sax::{
    Attribute, DefaultHandler, NamespaceBinding, ProcessingInstruction, SaxHandler, Tag,
};
