#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! # pdf_structure
//!
//! Reconstructs a PDF's logical reading structure from the fragments an
//! external extractor already pulled off the page. Given one page's
//! positioned text fragments and media regions, the pipeline:
//!
//! - merges same-baseline fragments and folds super/subscripts back into
//!   their parent text (the fragment layout engine)
//! - detects single- or multi-column layout and assigns a column id to
//!   every fragment (the column resolver)
//! - linearises fragments into a single reading order, partitioned into
//!   reading blocks (the reading-order assigner)
//! - deduplicates overlapping raster/vector/table regions and places them
//!   in the reading order (the media resolver)
//! - groups fragments into paragraphs, merging continuations across page
//!   breaks (the paragraph grouper)
//! - derives font roles (body, heading levels, title, TOC/index headings)
//!   from document-wide frequency statistics, filters running headers and
//!   footers, and labels the final paragraph/media stream into a
//!   DocBook-like tree (the font-role & semantic labeller)
//! - tracks every media resource from its first appearance through to its
//!   final packaged name (the reference mapper)
//!
//! ## Quick start
//!
//! ```ignore
//! use pdf_structure::pipeline::Pipeline;
//! use pdf_structure::pipeline::config::PipelineConfig;
//! use pdf_structure::pipeline::collaborators::InMemoryDocument;
//! use pdf_structure::font::FontSpecTable;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = InMemoryDocument::default();
//! let mut pipeline = Pipeline::new(PipelineConfig::default(), FontSpecTable::new())?;
//!
//! let mut bundles = Vec::new();
//! for page in 1..=document.pages.len() as u32 {
//!     bundles.push(pipeline.process_page(&document, page)?);
//! }
//! let tree = pipeline.finalize(bundles)?;
//! println!("{} chapters", tree.chapters.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

pub mod document_tree;
pub mod error;
pub mod font;
pub mod fragment;
pub mod geometry;
pub mod layout;
pub mod media;
pub mod paragraph;
pub mod pipeline;
pub mod reference_mapper;
pub mod semantic;

pub use document_tree::DocumentTree;
pub use error::{Error, Result};
pub use pipeline::Pipeline;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with('0'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_structure");
    }
}
