//! Bidirectional identity lookup between platform accounts and institution IDs.
//!
//! Loaded once from a headered CSV table and read-only afterwards. The
//! orchestrator owns the value and passes it by reference to whatever needs it.

use crate::config::CrosswalkConfig;
use crate::error::{GradeError, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

/// One row of the identity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub platform_id: String,
    pub institution_id: String,
    /// Every other column, carried through unmodified.
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct Crosswalk {
    records: Vec<IdentityRecord>,
    by_platform: HashMap<String, usize>,
    by_institution: HashMap<String, usize>,
}

impl Crosswalk {
    pub fn load(path: &Path, columns: &CrosswalkConfig) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, columns)
    }

    /// Build from any CSV source. A duplicate platform ID replaces the
    /// earlier row (last write wins) and is logged.
    pub fn from_reader<R: Read>(source: R, columns: &CrosswalkConfig) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| GradeError::MalformedTable {
                    column: name.to_string(),
                })
        };
        let platform_col = column(&columns.platform_column)?;
        let institution_col = column(&columns.institution_column)?;

        let mut walk = Crosswalk::default();
        for row in reader.records() {
            let row = row?;
            let platform_id = row.get(platform_col).unwrap_or_default().to_string();
            let institution_id = row.get(institution_col).unwrap_or_default().to_string();
            if platform_id.is_empty() {
                tracing::warn!(line = ?row.position().map(|p| p.line()), "identity row without platform id, skipped");
                continue;
            }
            let extra = headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != platform_col && *i != institution_col)
                .map(|(i, h)| (h.to_string(), row.get(i).unwrap_or_default().to_string()))
                .collect();
            walk.insert(IdentityRecord {
                platform_id,
                institution_id,
                extra,
            });
        }
        tracing::debug!(rows = walk.len(), "loaded identity crosswalk");
        Ok(walk)
    }

    fn insert(&mut self, record: IdentityRecord) {
        if let Some(&old) = self.by_platform.get(&record.platform_id) {
            tracing::warn!(
                platform_id = %record.platform_id,
                "duplicate platform id in identity table, later row wins"
            );
            let stale = &self.records[old];
            if self.by_institution.get(&stale.institution_id) == Some(&old) {
                self.by_institution.remove(&stale.institution_id);
            }
            if !record.institution_id.is_empty() {
                self.by_institution.insert(record.institution_id.clone(), old);
            }
            self.records[old] = record;
            return;
        }
        let idx = self.records.len();
        self.by_platform.insert(record.platform_id.clone(), idx);
        if !record.institution_id.is_empty() {
            self.by_institution.insert(record.institution_id.clone(), idx);
        }
        self.records.push(record);
    }

    pub fn by_platform_id(&self, id: &str) -> Option<&IdentityRecord> {
        self.by_platform.get(id).map(|&i| &self.records[i])
    }

    pub fn by_institution_id(&self, id: &str) -> Option<&IdentityRecord> {
        self.by_institution.get(id).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
