//! On-disk layout of one index.
//!
//! A storage location is a directory holding three files:
//!
//! - `meta.json` - format version, schema descriptor, document count
//! - `docs.json` - stored-field documents by slot
//! - `postings.bin` - binary posting lists, delta-encoded varint slots
//!
//! Each file is written to a temp name, fsynced, then renamed, so a commit
//! is durable before the new snapshot becomes visible. Any failure to load
//! is reported as [`OpenError`] and recovered upstream by a full rebuild;
//! the layout is otherwise opaque to callers.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, OpenError, Result};
use crate::index::snapshot::{DocSlot, Snapshot, TermKey};
use crate::schema::{Document, FieldDescriptor, Schema};
use crate::utils::encoding::{delta_decode, delta_encode, read_u16_le, read_u32_le, write_u16_le, write_u32_le};

pub const FORMAT_VERSION: u32 = 1;

const META_FILE: &str = "meta.json";
const DOCS_FILE: &str = "docs.json";
const POSTINGS_FILE: &str = "postings.bin";

/// Index metadata stored in meta.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub fields: Vec<FieldDescriptor>,
    pub doc_count: u64,
    pub updated_at: u64,
}

/// Persist a snapshot into the storage location.
///
/// meta.json is written last: its presence marks a complete index, so a
/// crash mid-write leaves a location that fails to open and gets rebuilt.
pub fn save(dir: &Path, schema: &Schema, snapshot: &Snapshot) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let postings_path = dir.join(POSTINGS_FILE);
    write_atomic(&postings_path, |file| write_postings(file, snapshot))
        .map_err(|e| Error::io(&postings_path, e))?;

    let docs_path = dir.join(DOCS_FILE);
    write_atomic(&docs_path, |file| {
        serde_json::to_writer(file, snapshot.docs()).map_err(io::Error::other)
    })
    .map_err(|e| Error::io(&docs_path, e))?;

    let meta = IndexMeta {
        version: FORMAT_VERSION,
        fields: schema.descriptor(),
        doc_count: snapshot.doc_count(),
        updated_at: unix_now(),
    };
    let meta_path = dir.join(META_FILE);
    write_atomic(&meta_path, |file| {
        serde_json::to_writer_pretty(file, &meta).map_err(io::Error::other)
    })
    .map_err(|e| Error::io(&meta_path, e))?;

    Ok(())
}

/// Load and validate a persisted index
pub fn load(dir: &Path, schema: &Schema) -> std::result::Result<Snapshot, OpenError> {
    let meta_path = dir.join(META_FILE);
    if !meta_path.exists() {
        return Err(OpenError::Missing(meta_path));
    }

    let meta_bytes = fs::read(&meta_path).map_err(|e| OpenError::Unreadable {
        path: meta_path.clone(),
        source: e,
    })?;
    let meta: IndexMeta =
        serde_json::from_slice(&meta_bytes).map_err(|e| OpenError::Corrupt {
            path: meta_path.clone(),
            reason: e.to_string(),
        })?;

    if meta.version != FORMAT_VERSION {
        return Err(OpenError::Version {
            found: meta.version,
            expected: FORMAT_VERSION,
        });
    }
    if meta.fields != schema.descriptor() {
        return Err(OpenError::SchemaMismatch);
    }

    let docs_path = dir.join(DOCS_FILE);
    let docs_bytes = fs::read(&docs_path).map_err(|e| OpenError::Unreadable {
        path: docs_path.clone(),
        source: e,
    })?;
    let docs: Vec<Option<Document>> =
        serde_json::from_slice(&docs_bytes).map_err(|e| OpenError::Corrupt {
            path: docs_path.clone(),
            reason: e.to_string(),
        })?;

    let postings_path = dir.join(POSTINGS_FILE);
    let postings_bytes = fs::read(&postings_path).map_err(|e| OpenError::Unreadable {
        path: postings_path.clone(),
        source: e,
    })?;
    let postings = read_postings(&postings_bytes).map_err(|reason| OpenError::Corrupt {
        path: postings_path.clone(),
        reason,
    })?;

    let snapshot = Snapshot::from_parts(docs, postings).map_err(|reason| OpenError::Corrupt {
        path: postings_path.clone(),
        reason,
    })?;

    if snapshot.doc_count() != meta.doc_count {
        return Err(OpenError::Corrupt {
            path: meta_path,
            reason: format!(
                "document count mismatch: meta says {}, index holds {}",
                meta.doc_count,
                snapshot.doc_count()
            ),
        });
    }

    Ok(snapshot)
}

/// Write through a temp file, fsync, then rename into place
fn write_atomic(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = BufWriter::new(File::create(&tmp)?);
    write(&mut file)?;
    file.flush()?;
    file.get_ref().sync_all()?;
    fs::rename(&tmp, path)
}

/// Postings format: entry count, then per entry
/// [field u16][term_len u16][term bytes][slot count u32][encoded len u32][delta varints]
fn write_postings<W: Write>(writer: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    // Deterministic order keeps commits byte-stable for identical content
    let mut entries: Vec<(&TermKey, Vec<DocSlot>)> = snapshot
        .postings()
        .map(|(key, bitmap)| (key, bitmap.iter().collect()))
        .collect();
    entries.sort_by(|(a, _), (b, _)| (a.field, a.term.as_str()).cmp(&(b.field, b.term.as_str())));

    write_u32_le(writer, entries.len() as u32)?;

    for (key, slots) in entries {
        let mut encoded = Vec::new();
        delta_encode(&slots, &mut encoded);

        write_u16_le(writer, key.field)?;
        let term_bytes = key.term.as_bytes();
        write_u16_le(writer, term_bytes.len() as u16)?;
        writer.write_all(term_bytes)?;
        write_u32_le(writer, slots.len() as u32)?;
        write_u32_le(writer, encoded.len() as u32)?;
        writer.write_all(&encoded)?;
    }

    Ok(())
}

fn read_postings(mut data: &[u8]) -> std::result::Result<Vec<(TermKey, Vec<DocSlot>)>, String> {
    let entry_count = read_u32_le(&mut data).map_err(|_| "truncated header".to_string())?;
    let mut entries = Vec::with_capacity(entry_count as usize);

    for _ in 0..entry_count {
        let field = read_u16_le(&mut data).map_err(|_| "truncated entry".to_string())?;
        let term_len = read_u16_le(&mut data).map_err(|_| "truncated entry".to_string())? as usize;
        if data.len() < term_len {
            return Err("truncated term".to_string());
        }
        let term = std::str::from_utf8(&data[..term_len])
            .map_err(|_| "term is not valid utf-8".to_string())?
            .to_string();
        data = &data[term_len..];

        let slot_count = read_u32_le(&mut data).map_err(|_| "truncated entry".to_string())?;
        let encoded_len =
            read_u32_le(&mut data).map_err(|_| "truncated entry".to_string())? as usize;
        if data.len() < encoded_len {
            return Err("truncated postings block".to_string());
        }
        let slots = delta_decode(&data[..encoded_len], slot_count as usize)
            .ok_or_else(|| "malformed postings block".to_string())?;
        data = &data[encoded_len..];

        entries.push((TermKey::new(field, term), slots));
    }

    if !data.is_empty() {
        return Err("trailing bytes after last entry".to_string());
    }
    Ok(entries)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
