//! Durable record of already-processed identifiers
//!
//! The store is a single JSON file read wholesale on load and replaced
//! wholesale on save. Saving writes a sibling temporary file and renames it
//! over the target so an interrupted write leaves the previous state intact.

use super::StateError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// An identifier together with the moment it was first observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRecord {
    pub identifier: String,
    pub first_seen_at: DateTime<Utc>,
}

/// Shape written by this crate
#[derive(Debug, Serialize)]
struct StateFile<'a> {
    last_updated: DateTime<Utc>,
    entries: &'a BTreeMap<String, DateTime<Utc>>,
}

/// Every shape accepted on read
///
/// Order matters: the untagged enum tries variants top to bottom, and the
/// plain map would otherwise swallow the wrapped shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OnDiskState {
    Native {
        entries: BTreeMap<String, String>,
    },
    Wrapped {
        processed_urls: Vec<String>,
    },
    List(Vec<String>),
    Timestamped(BTreeMap<String, String>),
}

/// Result of reading the file: the entries and whether they came from the
/// native shape (a rewrite is then unnecessary when nothing changed)
struct Loaded {
    entries: BTreeMap<String, DateTime<Utc>>,
    native: bool,
}

/// Persists the set of identifiers already processed by earlier runs
///
/// Single writer only: the load-merge-save cycle takes no lock, so two
/// processes saving to the same file can lose each other's updates.
#[derive(Debug, Clone)]
pub struct CrawlStateStore {
    path: PathBuf,
}

impl CrawlStateStore {
    /// Creates a store backed by the file at `path`
    ///
    /// Nothing is read or created until `load` or `merge_and_save` is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the previously persisted identifiers
    ///
    /// A missing, unreadable or corrupt file yields an empty set. Losing
    /// the baseline only means some items get processed again.
    pub fn load(&self) -> BTreeSet<String> {
        self.read().entries.into_keys().collect()
    }

    /// Returns the persisted identifiers with their first-seen timestamps
    pub fn load_records(&self) -> Vec<SeenRecord> {
        self.read()
            .entries
            .into_iter()
            .map(|(identifier, first_seen_at)| SeenRecord {
                identifier,
                first_seen_at,
            })
            .collect()
    }

    /// Merges `new_ids` into the persisted set and writes the union back
    ///
    /// # Arguments
    ///
    /// * `new_ids` - Identifiers observed during this session
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of identifiers that were not already stored
    /// * `Err(StateError)` - The union could not be written
    pub fn merge_and_save(&self, new_ids: &BTreeSet<String>) -> Result<usize, StateError> {
        let Loaded {
            mut entries,
            native,
        } = self.read();

        let now = Utc::now();
        let mut added = 0;
        for id in new_ids {
            if !entries.contains_key(id) {
                entries.insert(id.clone(), now);
                added += 1;
            }
        }

        if added == 0 && native {
            tracing::debug!(
                "No new identifiers for {}, leaving file untouched",
                self.path.display()
            );
            return Ok(0);
        }

        self.write_atomic(&entries, now)?;
        tracing::info!(
            "Saved {} identifiers ({} new) to {}",
            entries.len(),
            added,
            self.path.display()
        );

        Ok(added)
    }

    fn read(&self) -> Loaded {
        let empty = Loaded {
            entries: BTreeMap::new(),
            native: false,
        };

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "No state file at {}, starting fresh",
                    self.path.display()
                );
                return empty;
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read state file {}: {}. Starting with empty state",
                    self.path.display(),
                    e
                );
                return empty;
            }
        };

        let parsed: OnDiskState = match serde_json::from_str(&content) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    "Corrupt state file {}: {}. Starting with empty state",
                    self.path.display(),
                    e
                );
                return empty;
            }
        };

        let load_time = Utc::now();
        match parsed {
            OnDiskState::Native { entries } => Loaded {
                entries: entries
                    .into_iter()
                    .map(|(id, ts)| (id, parse_timestamp(&ts).unwrap_or(load_time)))
                    .collect(),
                native: true,
            },
            OnDiskState::Wrapped { processed_urls } | OnDiskState::List(processed_urls) => {
                Loaded {
                    entries: processed_urls
                        .into_iter()
                        .map(|id| (id, load_time))
                        .collect(),
                    native: false,
                }
            }
            OnDiskState::Timestamped(map) => Loaded {
                entries: map
                    .into_iter()
                    .map(|(id, ts)| (id, parse_timestamp(&ts).unwrap_or(load_time)))
                    .collect(),
                native: false,
            },
        }
    }

    fn write_atomic(
        &self,
        entries: &BTreeMap<String, DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(&StateFile {
            last_updated: now,
            entries,
        })?;

        write_file_atomic(&self.path, json.as_bytes()).map_err(|source| StateError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// Writes `bytes` to a temporary sibling and renames it over `path`
///
/// Readers see either the previous file or the complete new one. Parent
/// directories are created as needed.
pub(crate) fn write_file_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// `<file>.tmp` next to the target, so the rename stays on one filesystem
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Parses RFC 3339 or a naive ISO-8601 timestamp (taken as UTC)
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
