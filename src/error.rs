//! Error types for the reading-order reconstruction pipeline.
//!
//! This module defines all error types that can occur while turning positioned
//! fragments and media regions into a structured document tree. Most per-page
//! problems recover locally with a diagnostic; only document-wide invariant
//! violations abort emission.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during reading-order reconstruction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fragment or media region was missing required geometry or metadata.
    ///
    /// Per-page recoverable: the offending item is dropped with a diagnostic
    /// rather than aborting the whole document.
    #[error("Malformed input on page {page}: {reason}")]
    MalformedInput {
        /// Page number where the problem was found
        page: u32,
        /// Description of what was wrong
        reason: String,
    },

    /// A media reference in the final document tree could not be resolved
    /// by the reference mapper.
    ///
    /// Document-wide: aborts emission, since a dangling reference would
    /// produce a broken package downstream.
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A structural invariant was violated (e.g. a merged fragment's bounding
    /// box does not cover the union of its constituent fragments).
    ///
    /// Document-wide: indicates a bug in one of the core stages rather than
    /// a malformed document, so no partial tree is written.
    #[error("Inconsistent state on page {page}: {reason}")]
    InconsistentState {
        /// Page number where the inconsistency was detected
        page: u32,
        /// Description of the violated invariant
        reason: String,
    },

    /// A tunable configuration constant was set outside its documented domain.
    #[error("Configuration value out of range: {field} = {value} (expected {expected})")]
    ConfigOutOfRange {
        /// Name of the configuration field
        field: String,
        /// The out-of-range value, formatted
        value: String,
        /// Description of the valid domain
        expected: String,
    },

    /// IO error at one of the pipeline's external boundaries (reading
    /// fragments/media, writing the tree, or the reference-mapper side file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The reference-mapper side file could not be parsed.
    #[error("Reference mapper persistence error: {0}")]
    MapperPersistence(String),

    /// Serialization/deserialization error via serde_json, used by the
    /// reference mapper's export/import side file.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
