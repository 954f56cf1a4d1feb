// element module
mod element;
// writer module
mod writer;

//─────────────────────────────────────────────────────────────────────────────
// Public re-exports.
//─────────────────────────────────────────────────────────────────────────────
pub use element::{Attribute, Document, Element, XmlNode};
pub use writer::to_pretty_string;
