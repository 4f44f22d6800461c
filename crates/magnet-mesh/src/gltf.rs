// crates/magnet-mesh/src/gltf.rs
// ============================================================================
// Module: MAGNET glTF/GLB Builder
// Description: Contract-validated glTF 2.0 construction with binary framing.
// Purpose: Single source of truth for mesh buffer layout and GLB output.
// Dependencies: crate::{contracts, errors, schema}, base64, serde, serde_json
// ============================================================================

//! ## Overview
//! All mesh writing goes through [`GltfBuilder::write_mesh_primitive`]. No
//! other method writes vertex, normal, or index data; that single-writer rule
//! is what prevents export paths from diverging on attribute handling. The
//! builder validates the mesh contract before any buffer byte, pads every
//! attribute block to a 4-byte boundary, and frames GLB output exactly per
//! the glTF 2.0 container specification.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use serde::Serialize;

use crate::contracts::AttributePolicy;
use crate::contracts::PrimitiveRef;
use crate::contracts::validate_mesh;
use crate::errors::ExportError;
use crate::schema::ExportMetadata;
use crate::schema::MaterialDef;
use crate::schema::MeshData;

// ============================================================================
// SECTION: glTF Constants
// ============================================================================

/// Generator string carried in `asset.generator`.
const GENERATOR: &str = "MAGNET v1.2";
/// glTF componentType for 32-bit floats.
const COMPONENT_FLOAT: u32 = 5126;
/// glTF componentType for unsigned 32-bit indices.
const COMPONENT_UINT32: u32 = 5125;
/// bufferView target for vertex attributes.
const TARGET_ARRAY_BUFFER: u32 = 34962;
/// bufferView target for indices.
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;
/// GLB chunk type for the JSON chunk (`JSON`).
const CHUNK_JSON: u32 = 0x4E4F_534A;
/// GLB chunk type for the binary chunk (`BIN\0`).
const CHUNK_BIN: u32 = 0x004E_4942;

// ============================================================================
// SECTION: glTF Document Model
// ============================================================================

/// `asset` block of the glTF document.
#[derive(Debug, Clone, Serialize)]
struct GltfAsset {
    /// glTF specification version.
    version: String,
    /// Producing tool identifier.
    generator: String,
    /// Export identifiers (export id, branch, commit).
    extras: serde_json::Value,
}

/// One scene listing its root nodes.
#[derive(Debug, Clone, Serialize)]
struct GltfScene {
    /// Node indices in the scene.
    nodes: Vec<usize>,
}

/// One node referencing a mesh.
#[derive(Debug, Clone, Serialize)]
struct GltfNode {
    /// Mesh index.
    mesh: usize,
    /// Node name.
    name: String,
}

/// One primitive referencing its accessors.
#[derive(Debug, Clone, Serialize)]
struct GltfPrimitive {
    /// Attribute name to accessor index.
    attributes: BTreeMap<String, usize>,
    /// Primitive mode.
    mode: u32,
    /// Index accessor, when indexed.
    #[serde(skip_serializing_if = "Option::is_none")]
    indices: Option<usize>,
    /// Material index, when assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    material: Option<usize>,
}

/// One mesh holding its primitives.
#[derive(Debug, Clone, Serialize)]
struct GltfMesh {
    /// Primitives of the mesh.
    primitives: Vec<GltfPrimitive>,
    /// Mesh name.
    name: String,
}

/// One view into the binary buffer.
#[derive(Debug, Clone, Serialize)]
struct GltfBufferView {
    /// Buffer index; always 0.
    buffer: usize,
    /// Byte offset into the buffer; always a multiple of 4.
    #[serde(rename = "byteOffset")]
    byte_offset: usize,
    /// View length in bytes.
    #[serde(rename = "byteLength")]
    byte_length: usize,
    /// GL binding target.
    target: u32,
}

/// One typed accessor over a buffer view.
#[derive(Debug, Clone, Serialize)]
struct GltfAccessor {
    /// Backing buffer view index.
    #[serde(rename = "bufferView")]
    buffer_view: usize,
    /// Byte offset within the view.
    #[serde(rename = "byteOffset")]
    byte_offset: usize,
    /// Component type code.
    #[serde(rename = "componentType")]
    component_type: u32,
    /// Element count.
    count: usize,
    /// Element type (`VEC3`, `SCALAR`).
    #[serde(rename = "type")]
    element_type: String,
    /// Per-axis minimum, on POSITION accessors.
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<Vec<f32>>,
    /// Per-axis maximum, on POSITION accessors.
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<Vec<f32>>,
}

/// PBR parameters of a material.
#[derive(Debug, Clone, Serialize)]
struct GltfPbr {
    /// Base color RGBA factors.
    #[serde(rename = "baseColorFactor")]
    base_color_factor: [f32; 4],
    /// Metallic factor.
    #[serde(rename = "metallicFactor")]
    metallic_factor: f32,
    /// Roughness factor.
    #[serde(rename = "roughnessFactor")]
    roughness_factor: f32,
}

/// One material.
#[derive(Debug, Clone, Serialize)]
struct GltfMaterial {
    /// Material name.
    name: String,
    /// PBR parameter block.
    #[serde(rename = "pbrMetallicRoughness")]
    pbr_metallic_roughness: GltfPbr,
    /// Alpha mode; `BLEND` for translucent materials.
    #[serde(rename = "alphaMode", skip_serializing_if = "Option::is_none")]
    alpha_mode: Option<String>,
}

/// The single binary buffer.
#[derive(Debug, Clone, Serialize)]
struct GltfBuffer {
    /// Buffer length in bytes; a multiple of 4.
    #[serde(rename = "byteLength")]
    byte_length: usize,
    /// Data URI, for `.gltf` embedding.
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
}

/// The complete glTF document.
#[derive(Debug, Clone, Serialize)]
struct GltfDocument {
    /// Asset block.
    asset: GltfAsset,
    /// Default scene index.
    scene: usize,
    /// Scenes.
    scenes: Vec<GltfScene>,
    /// Nodes.
    nodes: Vec<GltfNode>,
    /// Meshes.
    meshes: Vec<GltfMesh>,
    /// Accessors.
    accessors: Vec<GltfAccessor>,
    /// Buffer views.
    #[serde(rename = "bufferViews")]
    buffer_views: Vec<GltfBufferView>,
    /// Buffers; exactly one after finalize.
    buffers: Vec<GltfBuffer>,
    /// Materials, when any were added.
    #[serde(skip_serializing_if = "Option::is_none")]
    materials: Option<Vec<GltfMaterial>>,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Contract-validated glTF/GLB builder.
///
/// # Invariants
/// - [`GltfBuilder::write_mesh_primitive`] is the only method that appends
///   mesh data to the binary buffer.
/// - Every attribute block starts on a 4-byte boundary; the finished buffer
///   is padded to a multiple of 4.
pub struct GltfBuilder {
    /// Growable binary buffer.
    buffer: Vec<u8>,
    /// The glTF JSON document under construction.
    doc: GltfDocument,
}

impl GltfBuilder {
    /// Creates a builder carrying the export metadata in `asset.extras`.
    #[must_use]
    pub fn new(metadata: &ExportMetadata) -> Self {
        let extras = serde_json::to_value(metadata).unwrap_or(serde_json::Value::Null);
        Self {
            buffer: Vec::new(),
            doc: GltfDocument {
                asset: GltfAsset {
                    version: "2.0".to_string(),
                    generator: GENERATOR.to_string(),
                    extras,
                },
                scene: 0,
                scenes: vec![GltfScene {
                    nodes: Vec::new(),
                }],
                nodes: Vec::new(),
                meshes: Vec::new(),
                accessors: Vec::new(),
                buffer_views: Vec::new(),
                buffers: Vec::new(),
                materials: None,
            },
        }
    }

    /// Writes one mesh primitive with policy enforcement.
    ///
    /// This is the only method that writes mesh data to the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] listing every contract violation when the mesh
    /// fails its policy; nothing is written in that case.
    pub fn write_mesh_primitive(
        &mut self,
        mesh: &MeshData,
        name: &str,
        policy: &AttributePolicy,
    ) -> Result<PrimitiveRef, ExportError> {
        let violations = validate_mesh(mesh, policy, name);
        if !violations.is_empty() {
            return Err(ExportError::new(
                "gltf",
                format!("mesh contract violation: {}", violations.join("; ")),
            ));
        }

        self.align();
        let position_offset = self.buffer.len();
        let (min, max) = self.write_positions(&mesh.vertices);
        let position_length = self.buffer.len() - position_offset;

        let mut normal_span: Option<(usize, usize, usize)> = None;
        if policy.require_normal {
            if let Some(normals) = &mesh.normals {
                self.align();
                let offset = self.buffer.len();
                self.write_triples(normals);
                normal_span = Some((offset, self.buffer.len() - offset, normals.len() / 3));
            }
        }

        let mut index_span: Option<(usize, usize, usize)> = None;
        if policy.require_indices {
            self.align();
            let offset = self.buffer.len();
            self.write_indices(&mesh.indices);
            index_span = Some((offset, self.buffer.len() - offset, mesh.indices.len()));
        }

        let position_accessor = self.push_accessor(
            position_offset,
            position_length,
            TARGET_ARRAY_BUFFER,
            GltfAccessor {
                buffer_view: 0,
                byte_offset: 0,
                component_type: COMPONENT_FLOAT,
                count: mesh.vertex_count(),
                element_type: "VEC3".to_string(),
                min: Some(min.to_vec()),
                max: Some(max.to_vec()),
            },
        );

        let normal_accessor = normal_span.map(|(offset, length, count)| {
            self.push_accessor(
                offset,
                length,
                TARGET_ARRAY_BUFFER,
                GltfAccessor {
                    buffer_view: 0,
                    byte_offset: 0,
                    component_type: COMPONENT_FLOAT,
                    count,
                    element_type: "VEC3".to_string(),
                    min: None,
                    max: None,
                },
            )
        });

        let index_accessor = index_span.map(|(offset, length, count)| {
            self.push_accessor(
                offset,
                length,
                TARGET_ELEMENT_ARRAY_BUFFER,
                GltfAccessor {
                    buffer_view: 0,
                    byte_offset: 0,
                    component_type: COMPONENT_UINT32,
                    count,
                    element_type: "SCALAR".to_string(),
                    min: None,
                    max: None,
                },
            )
        });

        let mut attributes = BTreeMap::new();
        attributes.insert("POSITION".to_string(), position_accessor);
        if let Some(accessor) = normal_accessor {
            attributes.insert("NORMAL".to_string(), accessor);
        }

        let mesh_index = self.doc.meshes.len();
        self.doc.meshes.push(GltfMesh {
            primitives: vec![GltfPrimitive {
                attributes,
                mode: policy.primitive_mode,
                indices: index_accessor,
                material: None,
            }],
            name: name.to_string(),
        });
        self.doc.nodes.push(GltfNode {
            mesh: mesh_index,
            name: name.to_string(),
        });
        self.doc.scenes[0].nodes.push(self.doc.nodes.len() - 1);

        Ok(PrimitiveRef {
            mesh_index,
            primitive_index: 0,
            position_accessor,
            normal_accessor,
            index_accessor,
        })
    }

    /// Adds PBR materials converted from hex colors.
    pub fn add_materials(&mut self, materials: &[MaterialDef]) {
        if materials.is_empty() {
            return;
        }
        let converted = materials
            .iter()
            .map(|material| {
                let (r, g, b) = parse_hex_color(&material.color);
                GltfMaterial {
                    name: material.name.clone(),
                    pbr_metallic_roughness: GltfPbr {
                        base_color_factor: [r, g, b, material.opacity],
                        metallic_factor: material.metalness,
                        roughness_factor: material.roughness,
                    },
                    alpha_mode: (material.opacity < 1.0).then(|| "BLEND".to_string()),
                }
            })
            .collect();
        self.doc.materials = Some(converted);
    }

    /// Assigns a material to a written mesh primitive.
    pub fn set_primitive_material(&mut self, mesh_index: usize, material_index: usize) {
        let material_count = self.doc.materials.as_ref().map_or(0, Vec::len);
        if material_index >= material_count {
            return;
        }
        if let Some(mesh) = self.doc.meshes.get_mut(mesh_index) {
            if let Some(primitive) = mesh.primitives.first_mut() {
                primitive.material = Some(material_index);
            }
        }
    }

    /// Finalizes to a GLB container.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when JSON encoding fails.
    pub fn finalize_glb(mut self) -> Result<Vec<u8>, ExportError> {
        self.align();
        let buffer_length = self.buffer.len();
        self.doc.buffers.push(GltfBuffer {
            byte_length: buffer_length,
            uri: None,
        });

        let mut json = serde_json::to_vec(&self.doc)
            .map_err(|err| ExportError::new("glb", format!("json encoding failed: {err}")))?;
        let json_padding = (4 - json.len() % 4) % 4;
        json.extend(std::iter::repeat_n(0x20_u8, json_padding));

        let total = 12 + 8 + json.len() + 8 + self.buffer.len();
        let mut output = Vec::with_capacity(total);
        output.extend_from_slice(b"glTF");
        output.extend_from_slice(&2_u32.to_le_bytes());
        output.extend_from_slice(&encode_u32("glb", total)?.to_le_bytes());

        output.extend_from_slice(&encode_u32("glb", json.len())?.to_le_bytes());
        output.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        output.extend_from_slice(&json);

        output.extend_from_slice(&encode_u32("glb", self.buffer.len())?.to_le_bytes());
        output.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        output.extend_from_slice(&self.buffer);

        Ok(output)
    }

    /// Finalizes to glTF JSON with the buffer embedded as a data URI.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when JSON encoding fails.
    pub fn finalize_gltf(mut self) -> Result<Vec<u8>, ExportError> {
        self.align();
        let encoded = Base64.encode(&self.buffer);
        self.doc.buffers.push(GltfBuffer {
            byte_length: self.buffer.len(),
            uri: Some(format!("data:application/octet-stream;base64,{encoded}")),
        });
        serde_json::to_vec_pretty(&self.doc)
            .map_err(|err| ExportError::new("gltf", format!("json encoding failed: {err}")))
    }

    /// Pads the buffer to a 4-byte boundary.
    ///
    /// glTF 2.0 requires bufferView byte offsets to be multiples of 4.
    fn align(&mut self) {
        let padding = (4 - self.buffer.len() % 4) % 4;
        self.buffer.extend(std::iter::repeat_n(0_u8, padding));
    }

    /// Writes position triples, returning per-axis (min, max).
    fn write_positions(&mut self, vertices: &[f32]) -> ([f32; 3], [f32; 3]) {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for triple in vertices.chunks_exact(3) {
            for axis in 0..3 {
                self.buffer.extend_from_slice(&triple[axis].to_le_bytes());
                min[axis] = min[axis].min(triple[axis]);
                max[axis] = max[axis].max(triple[axis]);
            }
        }
        (min, max)
    }

    /// Writes float triples without bounds tracking.
    fn write_triples(&mut self, values: &[f32]) {
        for value in values {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Writes indices as little-endian unsigned 32-bit scalars.
    fn write_indices(&mut self, indices: &[u32]) {
        for index in indices {
            self.buffer.extend_from_slice(&index.to_le_bytes());
        }
    }

    /// Registers a buffer view and its accessor; returns the accessor index.
    fn push_accessor(
        &mut self,
        byte_offset: usize,
        byte_length: usize,
        target: u32,
        mut accessor: GltfAccessor,
    ) -> usize {
        let view_index = self.doc.buffer_views.len();
        self.doc.buffer_views.push(GltfBufferView {
            buffer: 0,
            byte_offset,
            byte_length,
            target,
        });
        accessor.buffer_view = view_index;
        let accessor_index = self.doc.accessors.len();
        self.doc.accessors.push(accessor);
        accessor_index
    }
}

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

/// Converts a byte length into the GLB u32 field.
fn encode_u32(format: &str, length: usize) -> Result<u32, ExportError> {
    u32::try_from(length)
        .map_err(|_| ExportError::new(format, format!("chunk length {length} exceeds u32 range")))
}

/// Parses `#rrggbb` into RGB factors; malformed colors fall back to gray.
fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.trim_start_matches('#');
    if hex.len() == 6 {
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map(|value| f32::from(value) / 255.0)
        };
        if let (Ok(r), Ok(g), Ok(b)) = (channel(0..2), channel(2..4), channel(4..6)) {
            return (r, g, b);
        }
    }
    (0.7, 0.7, 0.7)
}
