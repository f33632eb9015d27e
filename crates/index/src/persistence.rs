//! On-disk snapshot of the index.
//!
//! A store directory holds two files:
//! - `index.bin`: bincode payload, then the magic `MQI1`, then a big-endian
//!   CRC32 of the payload
//! - `documents.json`: the id → document lookup table
//!
//! Both carry the same snapshot id and document count. Each file is written to
//! a `.tmp` sibling and renamed into place, and `read_snapshot` refuses any
//! pair that does not agree, so a crash between the two renames is detected
//! instead of loading a mix of old and new state.

use crate::error::{IndexError, IndexResult};
use crate::similarity::VectorEntry;
use crate::types::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

const INDEX_FILE: &str = "index.bin";
const DOCUMENTS_FILE: &str = "documents.json";
const SNAPSHOT_MAGIC: &[u8; 4] = b"MQI1";

/// Serialized similarity index state. Both variants are rebuilt from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub format_version: u32,
    pub snapshot_id: String,
    pub persisted_at: DateTime<Utc>,
    pub dimension: usize,
    pub next_seq: u64,
    pub entries: Vec<VectorEntry>,
    pub nlist: usize,
    pub centroids: Vec<Vec<f32>>,
    pub assignments: Vec<Option<u32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTable {
    pub format_version: u32,
    pub snapshot_id: String,
    pub documents: Vec<Document>,
}

pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE)
}

pub fn documents_path(dir: &Path) -> PathBuf {
    dir.join(DOCUMENTS_FILE)
}

/// Whether a snapshot appears to exist (both files present).
pub fn exists(dir: &Path) -> bool {
    index_path(dir).exists() && documents_path(dir).exists()
}

fn persistence_err(context: &str, path: &Path, e: impl std::fmt::Display) -> IndexError {
    IndexError::Persistence(format!("{} {:?}: {}", context, path, e))
}

/// Write both files atomically (temp file + rename each).
pub fn write_snapshot(dir: &Path, index: &IndexSnapshot, table: &DocumentTable) -> IndexResult<()> {
    fs::create_dir_all(dir).map_err(|e| persistence_err("Failed to create", dir, e))?;

    let payload = bincode::serialize(index)
        .map_err(|e| IndexError::Persistence(format!("Failed to encode index: {}", e)))?;
    let crc = crc32fast::hash(&payload);

    let mut output = Vec::with_capacity(payload.len() + 8);
    output.extend_from_slice(&payload);
    output.extend_from_slice(SNAPSHOT_MAGIC);
    output.extend_from_slice(&crc.to_be_bytes());

    let documents = serde_json::to_vec(table)
        .map_err(|e| IndexError::Persistence(format!("Failed to encode documents: {}", e)))?;

    let index_final = index_path(dir);
    let documents_final = documents_path(dir);
    let index_tmp = dir.join(format!("{}.tmp", INDEX_FILE));
    let documents_tmp = dir.join(format!("{}.tmp", DOCUMENTS_FILE));

    // Both temp files are complete before either rename happens.
    fs::write(&index_tmp, &output).map_err(|e| persistence_err("Failed to write", &index_tmp, e))?;
    fs::write(&documents_tmp, &documents)
        .map_err(|e| persistence_err("Failed to write", &documents_tmp, e))?;

    fs::rename(&index_tmp, &index_final)
        .map_err(|e| persistence_err("Failed to replace", &index_final, e))?;
    fs::rename(&documents_tmp, &documents_final)
        .map_err(|e| persistence_err("Failed to replace", &documents_final, e))?;

    tracing::info!(
        snapshot = %index.snapshot_id,
        vectors = index.entries.len(),
        bytes = payload.len(),
        crc,
        "Persisted index snapshot"
    );
    Ok(())
}

/// Read and cross-check both files.
///
/// Returned documents have their embeddings rehydrated from the index.
pub fn read_snapshot(dir: &Path, dimension: usize) -> IndexResult<(IndexSnapshot, Vec<Document>)> {
    let index = read_index(&index_path(dir))?;

    if index.format_version != FORMAT_VERSION {
        return Err(IndexError::Persistence(format!(
            "Unsupported index format version {}",
            index.format_version
        )));
    }
    if index.dimension != dimension {
        return Err(IndexError::Persistence(format!(
            "Persisted index has dimension {}, configured dimension is {}",
            index.dimension, dimension
        )));
    }

    let path = documents_path(dir);
    let raw = fs::read(&path).map_err(|e| persistence_err("Failed to read", &path, e))?;
    let table: DocumentTable =
        serde_json::from_slice(&raw).map_err(|e| persistence_err("Failed to decode", &path, e))?;

    if table.snapshot_id != index.snapshot_id {
        return Err(IndexError::Persistence(format!(
            "Index snapshot {} does not match document table snapshot {}",
            index.snapshot_id, table.snapshot_id
        )));
    }
    if table.documents.len() != index.entries.len() {
        return Err(IndexError::Persistence(format!(
            "Index holds {} vectors but document table holds {} documents",
            index.entries.len(),
            table.documents.len()
        )));
    }

    let vectors: HashMap<&str, &VectorEntry> =
        index.entries.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut documents = table.documents;
    for doc in &mut documents {
        let entry = vectors.get(doc.id.as_str()).ok_or_else(|| {
            IndexError::Persistence(format!("Document '{}' has no stored vector", doc.id))
        })?;
        doc.embedding = Some(entry.vector.clone());
    }

    tracing::debug!(
        snapshot = %index.snapshot_id,
        documents = documents.len(),
        "Read index snapshot"
    );

    Ok((index, documents))
}

fn read_index(path: &Path) -> IndexResult<IndexSnapshot> {
    let raw = fs::read(path).map_err(|e| persistence_err("Failed to read", path, e))?;

    if raw.len() < 8 || &raw[raw.len() - 8..raw.len() - 4] != SNAPSHOT_MAGIC {
        return Err(IndexError::Persistence(format!(
            "{:?} is truncated or not an index snapshot",
            path
        )));
    }

    let payload = &raw[..raw.len() - 8];
    let mut footer = [0u8; 4];
    footer.copy_from_slice(&raw[raw.len() - 4..]);
    let stored_crc = u32::from_be_bytes(footer);
    let computed_crc = crc32fast::hash(payload);

    if stored_crc != computed_crc {
        return Err(IndexError::Persistence(format!(
            "Snapshot CRC32 mismatch in {:?}: expected {:#010x}, got {:#010x}",
            path, stored_crc, computed_crc
        )));
    }

    bincode::deserialize(payload).map_err(|e| persistence_err("Failed to decode", path, e))
}
