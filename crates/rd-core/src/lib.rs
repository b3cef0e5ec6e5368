pub mod emitter;
pub mod error;
pub mod id;
pub mod inline;
pub mod model;
pub mod parser;
pub mod sanitize;
pub mod transform;

pub use emitter::{Markup, emit_document, emit_plain_text, truncate_plain};
pub use error::ParseError;
pub use id::NodeId;
pub use inline::{Inline, Mark, MarkKind, MarkSet, TextRun};
pub use model::*;
pub use parser::parse_document;
