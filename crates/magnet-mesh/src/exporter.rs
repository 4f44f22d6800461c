// crates/magnet-mesh/src/exporter.rs
// ============================================================================
// Module: MAGNET Geometry Exporter
// Description: Scene-level GLB and glTF export with LOD admission.
// Purpose: Route every scene mesh through the single primitive writer.
// Dependencies: crate::{contracts, errors, gltf, schema}
// ============================================================================

//! ## Overview
//! Scene export walks hull, decks, structures, lines, and points in that
//! order, writing each through [`GltfBuilder::write_mesh_primitive`]. An
//! optional LOD budget is checked before any building starts; a mesh over
//! budget fails the whole export without emitting bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::contracts::AttributePolicy;
use crate::contracts::MeshCategory;
use crate::errors::GeometryError;
use crate::gltf::GltfBuilder;
use crate::schema::ExportMetadata;
use crate::schema::LodLevel;
use crate::schema::MaterialDef;
use crate::schema::MeshData;
use crate::schema::SceneData;

// ============================================================================
// SECTION: Geometry Exporter
// ============================================================================

/// Scene exporter with an optional level-of-detail admission check.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryExporter {
    /// Vertex budget applied per mesh before building.
    lod: Option<LodLevel>,
}

impl GeometryExporter {
    /// Creates an exporter without a LOD budget.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lod: None,
        }
    }

    /// Creates an exporter enforcing a LOD budget per mesh.
    #[must_use]
    pub const fn with_lod(lod: LodLevel) -> Self {
        Self {
            lod: Some(lod),
        }
    }

    /// Exports a scene as a GLB container.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::LodExceeded`] when a mesh is over budget and
    /// [`GeometryError::Export`] on contract violations; no bytes are emitted
    /// in either case.
    pub fn export_scene_glb(
        &self,
        scene: &SceneData,
        metadata: &ExportMetadata,
        materials: &[MaterialDef],
    ) -> Result<Vec<u8>, GeometryError> {
        let builder = self.build_scene(scene, metadata, materials)?;
        Ok(builder.finalize_glb()?)
    }

    /// Exports a scene as glTF JSON with an embedded buffer.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`GeometryExporter::export_scene_glb`].
    pub fn export_scene_gltf(
        &self,
        scene: &SceneData,
        metadata: &ExportMetadata,
        materials: &[MaterialDef],
    ) -> Result<Vec<u8>, GeometryError> {
        let builder = self.build_scene(scene, metadata, materials)?;
        Ok(builder.finalize_gltf()?)
    }

    /// Admits and writes every scene mesh through the single writer.
    fn build_scene(
        &self,
        scene: &SceneData,
        metadata: &ExportMetadata,
        materials: &[MaterialDef],
    ) -> Result<GltfBuilder, GeometryError> {
        for (mesh, _) in scene_meshes(scene) {
            self.admit(mesh)?;
        }

        let mut builder = GltfBuilder::new(metadata);
        builder.add_materials(materials);
        for (mesh, category) in scene_meshes(scene) {
            let policy = AttributePolicy::for_category(category);
            builder.write_mesh_primitive(mesh, &mesh.mesh_id, &policy)?;
        }
        Ok(builder)
    }

    /// Checks one mesh against the LOD vertex budget.
    fn admit(&self, mesh: &MeshData) -> Result<(), GeometryError> {
        if let Some(lod) = self.lod {
            let requested = mesh.vertex_count();
            let maximum = lod.max_vertices();
            if requested > maximum {
                return Err(GeometryError::LodExceeded {
                    requested,
                    maximum,
                });
            }
        }
        Ok(())
    }
}

/// Yields every scene mesh with its category, in canonical export order.
fn scene_meshes(scene: &SceneData) -> impl Iterator<Item = (&MeshData, MeshCategory)> {
    scene
        .hull
        .iter()
        .map(|mesh| (mesh, MeshCategory::Hull))
        .chain(scene.decks.iter().map(|mesh| (mesh, MeshCategory::Deck)))
        .chain(scene.structures.iter().map(|mesh| (mesh, MeshCategory::Structure)))
        .chain(scene.lines.iter().map(|mesh| (mesh, MeshCategory::Lines)))
        .chain(scene.points.iter().map(|mesh| (mesh, MeshCategory::Points)))
}
