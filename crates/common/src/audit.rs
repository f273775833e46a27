//! Comparison, audit and snapshot persistence
//!
//! A snapshot is one record serialized as a JSON document. Auditing loads a
//! prior snapshot and replaces the live record's change log with the
//! field-level differences between the two.

use crate::error::{Result, SchemaMismatch};
use crate::record::{ChangeEntry, DeviceRecord};
use crate::schema::{FlatField, Schema, View, flatten};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Where a prior snapshot comes from
#[derive(Debug, Clone, Copy)]
pub enum SnapshotSource<'a> {
    File(&'a Path),
    Bytes(&'a [u8]),
}

impl<'a> From<&'a Path> for SnapshotSource<'a> {
    fn from(path: &'a Path) -> Self {
        Self::File(path)
    }
}

impl<'a> From<&'a [u8]> for SnapshotSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

/// Compare two records field by field
///
/// Equal records short-circuit to an empty list. Records carrying different
/// schema tags are never compared.
pub fn compare<R: Schema + PartialEq>(a: &R, b: &R) -> Result<Vec<ChangeEntry>> {
    if a == b {
        return Ok(Vec::new());
    }

    if a.schema_tag() != b.schema_tag() {
        return Err(SchemaMismatch::ObjectType {
            left: a.schema_tag().to_string(),
            right: b.schema_tag().to_string(),
        }
        .into());
    }

    Ok(compare_flat(
        &flatten(a, View::Compare),
        &flatten(b, View::Compare),
    )?)
}

/// Compare two flattened records position by position
///
/// A count difference or a name difference at any position is a schema
/// mismatch. Otherwise one entry is emitted per differing value, in order.
pub fn compare_flat(
    a: &[FlatField],
    b: &[FlatField],
) -> std::result::Result<Vec<ChangeEntry>, SchemaMismatch> {
    if a.len() != b.len() {
        return Err(SchemaMismatch::FieldCount {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut changes = Vec::new();
    for (position, (left, right)) in a.iter().zip(b).enumerate() {
        if left.name != right.name {
            return Err(SchemaMismatch::FieldName {
                position,
                left: left.name.to_string(),
                right: right.name.to_string(),
            });
        }
        if left.value != right.value {
            changes.push(ChangeEntry::new(left.name, &left.value, &right.value));
        }
    }

    Ok(changes)
}

/// Write `record` to `path` as JSON
///
/// The document is written to a sibling temporary file and renamed into
/// place.
pub fn save_snapshot<R: Serialize>(record: &R, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(record)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");

    fs::write(&tmp, json)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    debug!("Saved snapshot to {}", path.display());
    Ok(())
}

/// Load a record from a file or an in-memory JSON document
pub fn restore_snapshot<R: DeserializeOwned>(source: SnapshotSource<'_>) -> Result<R> {
    let record = match source {
        SnapshotSource::File(path) => {
            let bytes = fs::read(path)?;
            debug!("Loaded snapshot from {}", path.display());
            serde_json::from_slice(&bytes)?
        }
        SnapshotSource::Bytes(bytes) => serde_json::from_slice(bytes)?,
    };
    Ok(record)
}

impl DeviceRecord {
    /// Persist this record to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        save_snapshot(self, path)
    }

    /// Replace this record with the snapshot stored at `path`
    pub fn restore_file(&mut self, path: &Path) -> Result<()> {
        *self = restore_snapshot(SnapshotSource::File(path))?;
        Ok(())
    }

    /// Replace this record with the snapshot in `bytes`
    pub fn restore_json(&mut self, bytes: &[u8]) -> Result<()> {
        *self = restore_snapshot(SnapshotSource::Bytes(bytes))?;
        Ok(())
    }

    /// Differences from this record to `other`
    pub fn compare(&self, other: &DeviceRecord) -> Result<Vec<ChangeEntry>> {
        compare(self, other)
    }

    /// Differences from this record to the snapshot at `path`
    pub fn compare_file(&self, path: &Path) -> Result<Vec<ChangeEntry>> {
        let other: DeviceRecord = restore_snapshot(SnapshotSource::File(path))?;
        compare(self, &other)
    }

    /// Differences from this record to the snapshot in `bytes`
    pub fn compare_json(&self, bytes: &[u8]) -> Result<Vec<ChangeEntry>> {
        let other: DeviceRecord = restore_snapshot(SnapshotSource::Bytes(bytes))?;
        compare(self, &other)
    }

    /// Audit this record against a prior snapshot
    ///
    /// Replaces the change log with the differences from the prior snapshot
    /// to this record and returns the number of changes. The change log is
    /// left untouched when the comparison fails.
    pub fn audit(&mut self, source: SnapshotSource<'_>) -> Result<usize> {
        let prior: DeviceRecord = restore_snapshot(source)?;
        let changes = compare(&prior, self)?;
        let count = changes.len();
        self.set_changes(changes);
        Ok(count)
    }

    pub fn audit_file(&mut self, path: &Path) -> Result<usize> {
        self.audit(SnapshotSource::File(path))
    }

    pub fn audit_json(&mut self, bytes: &[u8]) -> Result<usize> {
        self.audit(SnapshotSource::Bytes(bytes))
    }
}
