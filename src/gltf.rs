//! Inspection of glTF headers before handing them to the decoder.

use serde::Deserialize;

use crate::error::LoadError;


pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";
pub const MESHOPT_EXTENSION: &str = "EXT_meshopt_compression";

/// Required extensions that need a decoder this crate does not ship
const UNSUPPORTED_EXTENSIONS: [&str; 2] = [DRACO_EXTENSION, MESHOPT_EXTENSION];

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_JSON_CHUNK: u32 = 0x4E4F534A;


#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    #[serde(default)]
    extensions_required: Vec<String>,
}


fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let b = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}


/// Returns the JSON part of a `.gltf` or binary `.glb` file
fn json_chunk(bytes: &[u8]) -> Result<&[u8], String> {
    if !bytes.starts_with(GLB_MAGIC) {
        return Ok(bytes);
    }
    // 12-byte file header, then the first chunk must be JSON
    let length = read_u32(bytes, 12).ok_or("truncated GLB header")? as usize;
    let kind = read_u32(bytes, 16).ok_or("truncated GLB header")?;
    if kind != GLB_JSON_CHUNK {
        return Err(format!("first GLB chunk is 0x{:08X}, expected JSON", kind));
    }
    // u32 lengths can overflow a 32-bit usize
    20usize
        .checked_add(length)
        .and_then(|end| bytes.get(20..end))
        .ok_or_else(|| "truncated GLB JSON chunk".to_string())
}


pub fn required_extensions(bytes: &[u8]) -> Result<Vec<String>, String> {
    let json = json_chunk(bytes)?;
    let header: Header = serde_json::from_slice(json).map_err(|e| e.to_string())?;
    Ok(header.extensions_required)
}


/// Rejects models that require a mesh decoder which is not available
pub fn check_supported(url: &str, bytes: &[u8]) -> Result<(), LoadError> {
    let required = required_extensions(bytes).map_err(|reason| LoadError::Decode {
        url: url.to_string(),
        reason,
    })?;
    match required.into_iter().find(|e| UNSUPPORTED_EXTENSIONS.contains(&e.as_str())) {
        Some(extension) => Err(LoadError::UnsupportedExtension { url: url.to_string(), extension }),
        None => Ok(()),
    }
}
