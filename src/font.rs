//! Document-wide font tables: the immutable font-spec table established by
//! the external extractor, and the font-role table derived by the semantic
//! labeller.

use std::collections::HashMap;

/// Key into the font-spec table. Opaque beyond equality/ordering/hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u32);

/// Weight/style as reported by the extractor, following the same coarse
/// scale the PDF FontDescriptor uses (400 normal, 700 bold).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: FontWeight = FontWeight(400);
    pub const BOLD: FontWeight = FontWeight(700);

    pub fn is_bold(&self) -> bool {
        self.0 >= 600
    }
}

/// One document-wide font definition. Established once per document by the
/// external extractor and never mutated afterward.
#[derive(Debug, Clone)]
pub struct FontSpec {
    pub size: f32,
    pub family: String,
    pub color: (u8, u8, u8),
    pub weight: FontWeight,
    pub italic: bool,
}

/// Read-only table of every font used in the document, built once before any
/// page is processed.
#[derive(Debug, Clone, Default)]
pub struct FontSpecTable {
    specs: HashMap<FontId, FontSpec>,
}

impl FontSpecTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: FontId, spec: FontSpec) {
        self.specs.insert(id, spec);
    }

    pub fn get(&self, id: FontId) -> Option<&FontSpec> {
        self.specs.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FontId, &FontSpec)> {
        self.specs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }
}

/// The role a font-spec id plays in the document's logical structure, derived
/// document-wide by the font-role & semantic labeller from frequency and
/// page-coverage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    Body,
    /// Heading level 1..=6, rarer/larger levels being more senior.
    Heading(u8),
    Title,
    TocHeading,
    IndexHeading,
    Other,
}

/// Document-wide map from font-spec id to its derived role, built once in
/// the font-role derivation pass and read thereafter.
#[derive(Debug, Clone, Default)]
pub struct FontRoleTable {
    roles: HashMap<FontId, FontRole>,
}

impl FontRoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: FontId, role: FontRole) {
        self.roles.insert(id, role);
    }

    pub fn role_of(&self, id: FontId) -> FontRole {
        self.roles.get(&id).copied().unwrap_or(FontRole::Other)
    }

    pub fn body_font(&self) -> Option<FontId> {
        self.roles
            .iter()
            .find(|(_, role)| **role == FontRole::Body)
            .map(|(id, _)| *id)
    }
}
