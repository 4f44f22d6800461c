// crates/magnet-mesh/src/errors.rs
// ============================================================================
// Module: MAGNET Geometry Errors
// Description: Geometry pipeline error taxonomy and envelope rendering.
// Purpose: Classify export, LOD, and resource failures with remediation hints.
// Dependencies: magnet-core, serde, thiserror
// ============================================================================

//! ## Overview
//! Geometry failures are fatal to the current operation: contract violations,
//! LOD budget overruns, and resource exhaustion propagate as typed errors and
//! must not be caught silently. Each error renders as the shared JSON error
//! envelope with a one-sentence remediation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use magnet_core::ErrorEnvelope;
use magnet_core::ErrorKind;
use magnet_core::ToEnvelope;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Export Error
// ============================================================================

/// Contract or encoding failure in an export path.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("export failed ({format}): {reason}")]
pub struct ExportError {
    /// Export format tag (`gltf`, `glb`, `mnet`).
    pub format: String,
    /// Failure description, carrying the mesh name and every violation.
    pub reason: String,
}

impl ExportError {
    /// Creates an export error.
    #[must_use]
    pub fn new(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Geometry Error Taxonomy
// ============================================================================

/// Geometry pipeline errors.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Geometry is unavailable for the requested design.
    #[error("geometry unavailable: {0}")]
    Unavailable(String),
    /// A geometry parameter is invalid.
    #[error("geometry parameter error: {0}")]
    Parameter(String),
    /// Mesh generation failed.
    #[error("mesh generation failed: {0}")]
    MeshGeneration(String),
    /// The mesh exceeds the level-of-detail vertex budget.
    #[error("LOD exceeded: requested {requested} vertices, maximum {maximum}")]
    LodExceeded {
        /// Vertices the mesh carries.
        requested: usize,
        /// Vertices the LOD budget admits.
        maximum: usize,
    },
    /// A section cut could not be computed.
    #[error("section cut failed: {0}")]
    SectionCut(String),
    /// A bounded resource was exhausted.
    #[error("resource exhausted ({resource}): requested {requested}, maximum {maximum}")]
    ResourceExhausted {
        /// The exhausted resource.
        resource: String,
        /// Amount requested.
        requested: u64,
        /// Amount available.
        maximum: u64,
    },
    /// An export contract or encoding failure.
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl ToEnvelope for GeometryError {
    fn to_envelope(&self) -> ErrorEnvelope {
        let (code, hint) = match self {
            Self::Unavailable(_) => {
                ("unavailable", "Generate geometry for the design before exporting.")
            }
            Self::Parameter(_) => {
                ("parameter", "Correct the offending geometry parameter and retry.")
            }
            Self::MeshGeneration(_) => {
                ("mesh_generation", "Check the hull parameters for degenerate values.")
            }
            Self::LodExceeded { .. } => {
                ("lod_exceeded", "Export at a higher LOD tier or decimate the mesh.")
            }
            Self::SectionCut(_) => {
                ("section_cut", "Move the cutting plane inside the hull bounds.")
            }
            Self::ResourceExhausted { .. } => {
                ("resource_exhausted", "Reduce the export size or raise the resource limit.")
            }
            Self::Export(_) => {
                ("export", "Fix the listed mesh contract violations and re-export.")
            }
        };
        ErrorEnvelope::new(ErrorKind::Geometry, code, self.to_string(), hint)
    }
}
