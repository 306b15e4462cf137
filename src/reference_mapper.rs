//! Reference mapper: a pipeline-wide table from original resource
//! identifiers to per-chapter final names, persisted across stages.
//!
//! The only document-wide mutable state besides the font-role table (see
//! the design notes): built up append-only during extraction, then mutated
//! once more during packaging when chapters and final names are assigned.

use crate::error::{Error, Result};
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Raster,
    Vector,
    Table,
}

/// A serialisable rectangle, independent of `geometry::Rect`'s f32 fields so
/// the side-file format does not depend on the in-memory geometry type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl From<Rect> for Geometry {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceReference {
    pub original_id: String,
    pub intermediate_name: String,
    pub final_name: Option<String>,
    pub chapter_id: Option<u32>,
    pub resource_kind: ResourceKind,
    pub geometry: Geometry,
    pub first_seen_page: u32,
}

/// Owns every resource reference for the document's lifetime. A single
/// value threaded explicitly through the pipeline stages, never shared
/// mutable global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceMapper {
    resources: HashMap<String, ResourceReference>,
    page_chapters: HashMap<u32, u32>,
}

impl ReferenceMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent insert: a resource already known by `original_id` is left
    /// unchanged.
    pub fn add_resource(
        &mut self,
        original_id: impl Into<String>,
        intermediate_name: impl Into<String>,
        kind: ResourceKind,
        first_seen_page: u32,
        geometry: Rect,
    ) {
        let original_id = original_id.into();
        self.resources.entry(original_id.clone()).or_insert(ResourceReference {
            original_id,
            intermediate_name: intermediate_name.into(),
            final_name: None,
            chapter_id: None,
            resource_kind: kind,
            geometry: geometry.into(),
            first_seen_page,
        });
    }

    /// Establish the many-to-one page -> chapter mapping once chapters are
    /// finalised, and propagate it to every resource first seen on that
    /// page.
    pub fn assign_chapter(&mut self, page_id: u32, chapter_id: u32) {
        self.page_chapters.insert(page_id, chapter_id);
        for resource in self.resources.values_mut() {
            if resource.first_seen_page == page_id {
                resource.chapter_id = Some(chapter_id);
            }
        }
    }

    pub fn finalise_name(&mut self, original_id: &str, final_name: impl Into<String>) -> Result<()> {
        match self.resources.get_mut(original_id) {
            Some(r) => {
                r.final_name = Some(final_name.into());
                Ok(())
            }
            None => Err(Error::UnresolvedReference(original_id.to_string())),
        }
    }

    /// Look up the final name for a resource. Used when emitting
    /// `imagedata` attributes; every non-suppressed media region referenced
    /// by the final tree must resolve.
    pub fn resolve(&self, original_id: &str) -> Result<String> {
        self.resources
            .get(original_id)
            .and_then(|r| r.final_name.clone())
            .ok_or_else(|| Error::UnresolvedReference(original_id.to_string()))
    }

    /// Fail fast with the full list of unresolved ids among `ids`, instead
    /// of stopping at the first one.
    pub fn resolve_all(&self, ids: &[String]) -> Result<Vec<String>> {
        let mut unresolved = Vec::new();
        let mut resolved = Vec::new();
        for id in ids {
            match self.resolve(id) {
                Ok(name) => resolved.push(name),
                Err(_) => unresolved.push(id.clone()),
            }
        }
        if unresolved.is_empty() {
            Ok(resolved)
        } else {
            Err(Error::UnresolvedReference(unresolved.join(", ")))
        }
    }

    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn import(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let mapper = serde_json::from_str(&json)?;
        Ok(mapper)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
