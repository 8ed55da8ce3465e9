//! Self-describing N-D template container.
//!
//! Layout: magic, `u32` format version, `u64` header length, JSON header
//! (shape, baselines, metadata), then the flux as little-endian `f32` in
//! row-major order. All integers are little-endian.

use crate::domain::{
    ArchiveMetadata, ParameterBaseline, TemplateArchive, TemplateError, TemplateResult,
};
use crate::modules::serialization::{push_u32_le, push_u64_le, read_u32_le, read_u64_le};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

pub const ARCHIVE_MAGIC: &[u8; 8] = b"ZTNDARCH";
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

const PREAMBLE_LEN: usize = 8 + 4 + 8;
const VALUE_LEN: usize = std::mem::size_of::<f32>();

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArchiveHeader {
    shape: Vec<usize>,
    baselines: Vec<ParameterBaseline>,
    metadata: ArchiveMetadata,
}

pub fn encode_archive(archive: &TemplateArchive) -> TemplateResult<Vec<u8>> {
    let header = ArchiveHeader {
        shape: archive.flux().shape().to_vec(),
        baselines: archive.baselines().to_vec(),
        metadata: archive.metadata().clone(),
    };
    let header_bytes = serde_json::to_vec(&header).map_err(|source| {
        TemplateError::internal(
            "SYS.ARCHIVE_HEADER",
            format!("failed to render archive header: {}", source),
        )
    })?;

    let mut bytes =
        Vec::with_capacity(PREAMBLE_LEN + header_bytes.len() + archive.flux().len() * VALUE_LEN);
    bytes.extend_from_slice(ARCHIVE_MAGIC);
    push_u32_le(&mut bytes, ARCHIVE_FORMAT_VERSION);
    push_u64_le(&mut bytes, header_bytes.len() as u64);
    bytes.extend_from_slice(&header_bytes);
    for value in archive.flux().iter() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Ok(bytes)
}

pub fn decode_archive(bytes: &[u8]) -> TemplateResult<TemplateArchive> {
    if bytes.len() < PREAMBLE_LEN || &bytes[..ARCHIVE_MAGIC.len()] != ARCHIVE_MAGIC {
        return Err(TemplateError::input_validation(
            "INPUT.ARCHIVE_MAGIC",
            "file is not a template archive (bad magic)",
        ));
    }

    let version = read_u32_le(bytes, 8).ok_or_else(truncated)?;
    if version != ARCHIVE_FORMAT_VERSION {
        return Err(TemplateError::input_validation(
            "INPUT.ARCHIVE_VERSION",
            format!(
                "unsupported archive format version {} (expected {})",
                version, ARCHIVE_FORMAT_VERSION
            ),
        ));
    }

    let header_len = usize::try_from(read_u64_le(bytes, 12).ok_or_else(truncated)?)
        .map_err(|_| truncated())?;
    let header_end = PREAMBLE_LEN.checked_add(header_len).ok_or_else(truncated)?;
    let header_bytes = bytes.get(PREAMBLE_LEN..header_end).ok_or_else(truncated)?;
    let header: ArchiveHeader = serde_json::from_slice(header_bytes).map_err(|source| {
        TemplateError::input_validation(
            "INPUT.ARCHIVE_HEADER",
            format!("failed to parse archive header: {}", source),
        )
    })?;

    let payload = &bytes[header_end..];
    let expected = header
        .shape
        .iter()
        .try_fold(VALUE_LEN, |acc, dim| acc.checked_mul(*dim))
        .ok_or_else(truncated)?;
    if payload.len() != expected {
        return Err(TemplateError::input_validation(
            "INPUT.ARCHIVE_PAYLOAD",
            format!(
                "archive payload holds {} bytes but shape {:?} requires {}",
                payload.len(),
                header.shape,
                expected
            ),
        ));
    }

    let values: Vec<f32> = payload
        .chunks_exact(VALUE_LEN)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    let flux = ArrayD::from_shape_vec(IxDyn(&header.shape), values).map_err(|source| {
        TemplateError::input_validation(
            "INPUT.ARCHIVE_PAYLOAD",
            format!("failed to shape archive payload: {}", source),
        )
    })?;

    TemplateArchive::new(flux, header.baselines, header.metadata)
}

fn truncated() -> TemplateError {
    TemplateError::input_validation("INPUT.ARCHIVE_TRUNCATED", "template archive is truncated")
}
