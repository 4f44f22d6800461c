// crates/magnet-mesh/src/contracts.rs
// ============================================================================
// Module: MAGNET Mesh Contracts
// Description: Per-category attribute policies and pre-write validation.
// Purpose: Reject contract-violating meshes before any buffer byte is written.
// Dependencies: crate::schema, serde
// ============================================================================

//! ## Overview
//! Each mesh category declares which glTF attributes are required. The policy
//! table is the single source of truth; export paths must not define
//! attribute behavior independently. The validator accumulates every
//! violation so a bad mesh fails loudly with the complete list.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::schema::MeshData;

// ============================================================================
// SECTION: Categories and Policies
// ============================================================================

/// Closed set of mesh categories with distinct attribute requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshCategory {
    /// Hull surface; full attribute set.
    Hull,
    /// Deck surface; full attribute set.
    Deck,
    /// Internal structure; full attribute set.
    Structure,
    /// Polylines; positions only, line-strip mode.
    Lines,
    /// Point clouds; positions only, points mode.
    Points,
}

/// glTF primitive mode: triangles.
pub const MODE_TRIANGLES: u32 = 4;
/// glTF primitive mode: line strip.
pub const MODE_LINE_STRIP: u32 = 1;
/// glTF primitive mode: points.
pub const MODE_POINTS: u32 = 0;

/// Required and optional attributes for one mesh category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePolicy {
    /// Category this policy belongs to.
    pub category: MeshCategory,
    /// POSITION is required.
    pub require_position: bool,
    /// NORMAL is required.
    pub require_normal: bool,
    /// Triangle indices are required.
    pub require_indices: bool,
    /// Bounds are computed and written on the POSITION accessor.
    pub compute_bounds: bool,
    /// glTF primitive mode.
    pub primitive_mode: u32,
}

impl AttributePolicy {
    /// Returns the canonical policy for a mesh category.
    #[must_use]
    pub const fn for_category(category: MeshCategory) -> Self {
        match category {
            MeshCategory::Hull | MeshCategory::Deck | MeshCategory::Structure => Self {
                category,
                require_position: true,
                require_normal: true,
                require_indices: true,
                compute_bounds: true,
                primitive_mode: MODE_TRIANGLES,
            },
            MeshCategory::Lines => Self {
                category,
                require_position: true,
                require_normal: false,
                require_indices: false,
                compute_bounds: true,
                primitive_mode: MODE_LINE_STRIP,
            },
            MeshCategory::Points => Self {
                category,
                require_position: true,
                require_normal: false,
                require_indices: false,
                compute_bounds: true,
                primitive_mode: MODE_POINTS,
            },
        }
    }
}

// ============================================================================
// SECTION: Primitive Reference
// ============================================================================

/// Indices of a written primitive within the glTF document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveRef {
    /// Mesh index in the glTF document.
    pub mesh_index: usize,
    /// Primitive index within the mesh.
    pub primitive_index: usize,
    /// POSITION accessor index.
    pub position_accessor: usize,
    /// NORMAL accessor index, when written.
    pub normal_accessor: Option<usize>,
    /// Index accessor index, when written.
    pub index_accessor: Option<usize>,
}

// ============================================================================
// SECTION: Contract Validation
// ============================================================================

/// Validates a mesh against a policy, accumulating every violation.
///
/// An empty return means the mesh satisfies the contract. This runs before
/// any buffer byte is written.
#[must_use]
pub fn validate_mesh(mesh: &MeshData, policy: &AttributePolicy, mesh_name: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if mesh.vertices.is_empty() {
        errors.push(format!("{mesh_name}: POSITION vertices empty"));
    } else if mesh.vertices.len() % 3 != 0 {
        errors.push(format!(
            "{mesh_name}: POSITION count {} not divisible by 3",
            mesh.vertices.len()
        ));
    }

    if policy.require_normal {
        match &mesh.normals {
            None => errors.push(format!("{mesh_name}: NORMAL required but missing")),
            Some(normals) if normals.is_empty() => {
                errors.push(format!("{mesh_name}: NORMAL required but missing"));
            }
            Some(normals) if normals.len() != mesh.vertices.len() => {
                errors.push(format!(
                    "{mesh_name}: NORMAL count {} != POSITION count {}",
                    normals.len(),
                    mesh.vertices.len()
                ));
            }
            Some(_) => {}
        }
    }

    if policy.require_indices {
        if mesh.indices.is_empty() {
            errors.push(format!("{mesh_name}: indices required but missing"));
        } else if mesh.indices.len() % 3 != 0 {
            errors.push(format!(
                "{mesh_name}: indices count {} not divisible by 3",
                mesh.indices.len()
            ));
        } else {
            let vertex_count = mesh.vertex_count();
            if let Some(max_index) = mesh.indices.iter().max() {
                let out_of_range = match usize::try_from(*max_index) {
                    Ok(index) => index >= vertex_count,
                    Err(_) => true,
                };
                if out_of_range {
                    errors.push(format!(
                        "{mesh_name}: index {max_index} >= vertex count {vertex_count}"
                    ));
                }
            }
        }
    }

    errors
}
