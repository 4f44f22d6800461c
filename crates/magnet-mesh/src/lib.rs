// crates/magnet-mesh/src/lib.rs
// ============================================================================
// Module: MAGNET Mesh Library
// Description: Public API surface for geometry contracts and export.
// Purpose: Expose mesh schema, contracts, codecs, and the glTF/GLB builder.
// Dependencies: crate::{binary, contracts, errors, exporter, gltf, schema}
// ============================================================================

//! ## Overview
//! magnet-mesh is the one binary-accurate path for mesh writing. Attribute
//! policies per category, a contract validator that fails loudly before any
//! byte is written, a single-writer glTF/GLB builder, a scene exporter, and
//! the private `MNET` binary codec.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod binary;
pub mod contracts;
pub mod errors;
pub mod exporter;
pub mod gltf;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use binary::MeshCodecError;
pub use binary::deserialize_mesh;
pub use binary::serialize_mesh;
pub use contracts::AttributePolicy;
pub use contracts::MeshCategory;
pub use contracts::PrimitiveRef;
pub use contracts::validate_mesh;
pub use errors::ExportError;
pub use errors::GeometryError;
pub use exporter::GeometryExporter;
pub use gltf::GltfBuilder;
pub use schema::BoundingBox;
pub use schema::ExportMetadata;
pub use schema::LodLevel;
pub use schema::MaterialDef;
pub use schema::MeshData;
pub use schema::SCHEMA_VERSION;
pub use schema::SceneData;
