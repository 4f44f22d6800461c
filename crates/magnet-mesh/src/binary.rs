// crates/magnet-mesh/src/binary.rs
// ============================================================================
// Module: MAGNET Binary Mesh Codec
// Description: Versioned private binary mesh format with optional compression.
// Purpose: Compact mesh transmission with strict magic and version checks.
// Dependencies: crate::schema, flate2
// ============================================================================

//! ## Overview
//! The private mesh format is `MNET` magic, a schema version, a flag byte,
//! counts, the mesh identifier, then length-prefixed attribute blocks in a
//! fixed order. The payload after the header may be zlib-compressed.
//! Deserialization rejects foreign magic and unsupported versions outright.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::io::Write;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use thiserror::Error;

use crate::schema::BoundingBox;
use crate::schema::MeshData;
use crate::schema::SCHEMA_VERSION;

// ============================================================================
// SECTION: Format Constants
// ============================================================================

/// Format magic.
const MAGIC: [u8; 4] = *b"MNET";

/// Flag bit: payload is zlib-compressed.
const FLAG_COMPRESSED: u8 = 0x01;
/// Flag bit: NORMAL block present.
const FLAG_NORMALS: u8 = 0x02;
/// Flag bit: UV block present.
const FLAG_UVS: u8 = 0x04;
/// Flag bit: COLOR block present.
const FLAG_COLORS: u8 = 0x08;
/// Flag bit: TANGENT block present.
const FLAG_TANGENTS: u8 = 0x10;
/// Flag bit: BOUNDS block present.
const FLAG_BOUNDS: u8 = 0x20;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the binary mesh codec.
#[derive(Debug, Error)]
pub enum MeshCodecError {
    /// Input does not carry the `MNET` magic.
    #[error("foreign magic; not an MNET payload")]
    ForeignMagic,
    /// Input carries an unsupported schema version.
    #[error("unsupported MNET schema version {0}")]
    UnsupportedVersion(u16),
    /// Input ended before the declared content.
    #[error("truncated MNET payload")]
    Truncated,
    /// Input is structurally corrupt.
    #[error("corrupt MNET payload: {0}")]
    Corrupt(String),
}

// ============================================================================
// SECTION: Serialization
// ============================================================================

/// Serializes a mesh into the `MNET` format.
///
/// # Errors
///
/// Returns [`MeshCodecError::Corrupt`] when compression fails.
pub fn serialize_mesh(mesh: &MeshData, compress: bool) -> Result<Vec<u8>, MeshCodecError> {
    let mut flags = 0_u8;
    if compress {
        flags |= FLAG_COMPRESSED;
    }
    if mesh.normals.is_some() {
        flags |= FLAG_NORMALS;
    }
    if mesh.uvs.is_some() {
        flags |= FLAG_UVS;
    }
    if mesh.colors.is_some() {
        flags |= FLAG_COLORS;
    }
    if mesh.tangents.is_some() {
        flags |= FLAG_TANGENTS;
    }
    if mesh.bounds.is_some() {
        flags |= FLAG_BOUNDS;
    }

    let mut payload: Vec<u8> = Vec::new();
    write_block(&mut payload, mesh.mesh_id.as_bytes())?;
    write_block(&mut payload, &floats_to_bytes(&mesh.vertices))?;
    if let Some(normals) = &mesh.normals {
        write_block(&mut payload, &floats_to_bytes(normals))?;
    }
    write_block(&mut payload, &indices_to_bytes(&mesh.indices))?;
    if let Some(uvs) = &mesh.uvs {
        write_block(&mut payload, &floats_to_bytes(uvs))?;
    }
    if let Some(colors) = &mesh.colors {
        write_block(&mut payload, &floats_to_bytes(colors))?;
    }
    if let Some(tangents) = &mesh.tangents {
        write_block(&mut payload, &floats_to_bytes(tangents))?;
    }
    if let Some(bounds) = &mesh.bounds {
        let mut block = Vec::with_capacity(24);
        for value in bounds.min.iter().chain(bounds.max.iter()) {
            block.extend_from_slice(&value.to_le_bytes());
        }
        write_block(&mut payload, &block)?;
    }

    if compress {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&payload)
            .and_then(|()| encoder.finish())
            .map(|compressed| payload = compressed)
            .map_err(|err| MeshCodecError::Corrupt(err.to_string()))?;
    }

    let mut out = Vec::with_capacity(11 + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
    out.push(flags);
    out.extend_from_slice(&encode_len(mesh.vertex_count())?.to_le_bytes());
    out.extend_from_slice(&encode_len(mesh.indices.len())?.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

// ============================================================================
// SECTION: Deserialization
// ============================================================================

/// Deserializes a mesh from the `MNET` format.
///
/// # Errors
///
/// Returns [`MeshCodecError::ForeignMagic`] for foreign payloads,
/// [`MeshCodecError::UnsupportedVersion`] for newer schema versions, and
/// [`MeshCodecError::Truncated`] or [`MeshCodecError::Corrupt`] for damaged
/// input.
pub fn deserialize_mesh(data: &[u8]) -> Result<MeshData, MeshCodecError> {
    if data.len() < 15 {
        return Err(MeshCodecError::Truncated);
    }
    if data[0..4] != MAGIC {
        return Err(MeshCodecError::ForeignMagic);
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != SCHEMA_VERSION {
        return Err(MeshCodecError::UnsupportedVersion(version));
    }
    let flags = data[6];

    let payload_slice = &data[15..];
    let payload: Vec<u8> = if flags & FLAG_COMPRESSED == 0 {
        payload_slice.to_vec()
    } else {
        let mut decoder = ZlibDecoder::new(payload_slice);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|err| MeshCodecError::Corrupt(err.to_string()))?;
        decompressed
    };

    let mut cursor = 0_usize;
    let id_block = read_block(&payload, &mut cursor)?;
    let mesh_id = String::from_utf8(id_block.to_vec())
        .map_err(|err| MeshCodecError::Corrupt(err.to_string()))?;

    let vertices = bytes_to_floats(read_block(&payload, &mut cursor)?)?;
    let normals = if flags & FLAG_NORMALS == 0 {
        None
    } else {
        Some(bytes_to_floats(read_block(&payload, &mut cursor)?)?)
    };
    let indices = bytes_to_indices(read_block(&payload, &mut cursor)?)?;
    let uvs = if flags & FLAG_UVS == 0 {
        None
    } else {
        Some(bytes_to_floats(read_block(&payload, &mut cursor)?)?)
    };
    let colors = if flags & FLAG_COLORS == 0 {
        None
    } else {
        Some(bytes_to_floats(read_block(&payload, &mut cursor)?)?)
    };
    let tangents = if flags & FLAG_TANGENTS == 0 {
        None
    } else {
        Some(bytes_to_floats(read_block(&payload, &mut cursor)?)?)
    };
    let bounds = if flags & FLAG_BOUNDS == 0 {
        None
    } else {
        let block = read_block(&payload, &mut cursor)?;
        let values = bytes_to_floats(block)?;
        if values.len() != 6 {
            return Err(MeshCodecError::Corrupt(format!(
                "bounds block holds {} floats, expected 6",
                values.len()
            )));
        }
        Some(BoundingBox {
            min: [values[0], values[1], values[2]],
            max: [values[3], values[4], values[5]],
        })
    };

    Ok(MeshData {
        mesh_id,
        vertices,
        indices,
        normals,
        uvs,
        colors,
        tangents,
        bounds,
    })
}

// ============================================================================
// SECTION: Block Helpers
// ============================================================================

/// Appends a length-prefixed block.
///
/// # Errors
///
/// Returns [`MeshCodecError::Corrupt`] when the block exceeds the u32 wire
/// width.
fn write_block(out: &mut Vec<u8>, block: &[u8]) -> Result<(), MeshCodecError> {
    out.extend_from_slice(&encode_len(block.len())?.to_le_bytes());
    out.extend_from_slice(block);
    Ok(())
}

/// Reads one length-prefixed block, advancing the cursor.
fn read_block<'a>(payload: &'a [u8], cursor: &mut usize) -> Result<&'a [u8], MeshCodecError> {
    let header_end = cursor.checked_add(4).ok_or(MeshCodecError::Truncated)?;
    let header: [u8; 4] = payload
        .get(*cursor..header_end)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(MeshCodecError::Truncated)?;
    let length = usize::try_from(u32::from_le_bytes(header))
        .map_err(|_| MeshCodecError::Truncated)?;
    let end = header_end.checked_add(length).ok_or(MeshCodecError::Truncated)?;
    let block = payload.get(header_end..end).ok_or(MeshCodecError::Truncated)?;
    *cursor = end;
    Ok(block)
}

/// Encodes floats as little-endian bytes.
fn floats_to_bytes(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Encodes indices as little-endian bytes.
fn indices_to_bytes(values: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Decodes little-endian bytes into floats.
fn bytes_to_floats(block: &[u8]) -> Result<Vec<f32>, MeshCodecError> {
    if block.len() % 4 != 0 {
        return Err(MeshCodecError::Corrupt("float block length not a multiple of 4".to_string()));
    }
    Ok(block
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect())
}

/// Decodes little-endian bytes into indices.
fn bytes_to_indices(block: &[u8]) -> Result<Vec<u32>, MeshCodecError> {
    if block.len() % 4 != 0 {
        return Err(MeshCodecError::Corrupt("index block length not a multiple of 4".to_string()));
    }
    Ok(block
        .chunks_exact(4)
        .map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect())
}

/// Converts a length into the u32 wire width.
fn encode_len(value: usize) -> Result<u32, MeshCodecError> {
    u32::try_from(value)
        .map_err(|_| MeshCodecError::Corrupt(format!("block length {value} exceeds u32 range")))
}
