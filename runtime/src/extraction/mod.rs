//! Extractors turning raw content into index records.
//!
//! - [`json`]: search an arbitrary JSON document for the indices list
//! - [`script`]: pull hydration state out of inline script tags
//! - [`html`]: parse tables, then div rows, from the page markup
//!
//! None of them fail; a miss is an empty result.

pub mod html;
pub mod json;
pub mod script;

pub use html::extract_from_html;
pub use json::{is_empty_document, process_json_data};
pub use script::extract_from_script_tags;
