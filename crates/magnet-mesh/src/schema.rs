// crates/magnet-mesh/src/schema.rs
// ============================================================================
// Module: MAGNET Mesh Schema
// Description: Canonical mesh, scene, material, and export metadata types.
// Purpose: Single source of truth for geometry data crossing the export path.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Mesh data is flat float triples for positions and normals, flat index
//! lists, and optional secondary attributes. Scenes group meshes by category
//! for export. These types are the only geometry containers the exporters
//! accept; schema changes require a version bump in the binary codec.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Version of the geometry schema carried by the binary codec.
pub const SCHEMA_VERSION: u16 = 1;

// ============================================================================
// SECTION: Mesh Data
// ============================================================================

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner (x, y, z).
    pub min: [f32; 3],
    /// Maximum corner (x, y, z).
    pub max: [f32; 3],
}

/// One mesh: flat position triples, optional attributes, optional indices.
///
/// # Invariants
/// - `vertices.len()` is a multiple of 3.
/// - When present, `normals.len() == vertices.len()`.
/// - When present, `indices.len()` is a multiple of 3 and every index is
///   below the vertex count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    /// Mesh identifier.
    pub mesh_id: String,
    /// Flat position triples.
    pub vertices: Vec<f32>,
    /// Flat triangle indices.
    pub indices: Vec<u32>,
    /// Flat normal triples, matching `vertices` in length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<f32>>,
    /// Flat texture coordinate pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<f32>>,
    /// Flat vertex color triples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<f32>>,
    /// Flat tangent quadruples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tangents: Option<Vec<f32>>,
    /// Precomputed bounds, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
}

impl MeshData {
    /// Creates a mesh with positions and indices only.
    #[must_use]
    pub const fn new(mesh_id: String, vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            mesh_id,
            vertices,
            indices,
            normals: None,
            uvs: None,
            colors: None,
            tangents: None,
            bounds: None,
        }
    }

    /// Returns the vertex count.
    #[must_use]
    pub const fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Computes the bounding box from the positions.
    ///
    /// Returns `None` for an empty mesh.
    #[must_use]
    pub fn compute_bounds(&self) -> Option<BoundingBox> {
        if self.vertices.len() < 3 {
            return None;
        }
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for triple in self.vertices.chunks_exact(3) {
            for axis in 0..3 {
                min[axis] = min[axis].min(triple[axis]);
                max[axis] = max[axis].max(triple[axis]);
            }
        }
        Some(BoundingBox {
            min,
            max,
        })
    }
}

// ============================================================================
// SECTION: Scene Data
// ============================================================================

/// Scene grouping meshes by export category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneData {
    /// Owning design identifier.
    pub design_id: String,
    /// Hull surface mesh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hull: Option<MeshData>,
    /// Deck surface meshes.
    pub decks: Vec<MeshData>,
    /// Internal structure meshes.
    pub structures: Vec<MeshData>,
    /// Polyline meshes (waterlines, sections).
    pub lines: Vec<MeshData>,
    /// Point cloud meshes (markers, stations).
    pub points: Vec<MeshData>,
}

/// PBR material definition attached to exported primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDef {
    /// Material name.
    pub name: String,
    /// Hex color (`#rrggbb`).
    pub color: String,
    /// Opacity in [0, 1]; below 1 exports as alpha-blended.
    pub opacity: f32,
    /// Metalness factor in [0, 1].
    pub metalness: f32,
    /// Roughness factor in [0, 1].
    pub roughness: f32,
}

// ============================================================================
// SECTION: Export Metadata
// ============================================================================

/// Identifier block carried in `asset.extras` of every export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Export identifier.
    pub export_id: String,
    /// Source branch name.
    pub branch: String,
    /// Source commit hash.
    pub commit: String,
    /// Export format tag (`glb`, `gltf`).
    pub format: String,
    /// Geometry schema version.
    pub version: String,
    /// Export timestamp, RFC 3339.
    pub timestamp: String,
}

// ============================================================================
// SECTION: Level of Detail
// ============================================================================

/// Level-of-detail budgets mapped to maximum vertex counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LodLevel {
    /// Preview quality.
    Low,
    /// Interactive quality.
    Medium,
    /// Review quality.
    High,
    /// Archive quality.
    Ultra,
}

impl LodLevel {
    /// Returns the maximum vertex count admitted per mesh.
    #[must_use]
    pub const fn max_vertices(self) -> usize {
        match self {
            Self::Low => 5_000,
            Self::Medium => 50_000,
            Self::High => 250_000,
            Self::Ultra => 1_000_000,
        }
    }
}
