use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::account::{EntityKind, RecordId};
use crate::error::{LedgerError, Result};

pub const SELECTION_VERSION: u32 = 1;
const SELECTION_FILE: &str = "selection.json";

#[derive(Debug, Serialize, Deserialize)]
struct SelectionFile {
    version: u32,
    #[serde(default)]
    entities: BTreeMap<EntityKind, BTreeSet<RecordId>>,
}

/// Rows the user has chosen to include in totals, per account kind.
///
/// Stored as `selection.json` in the config directory. Files written by the
/// browser front end (flat `selected*Ids` keys, no version) are read as
/// version 0 and upgraded on the next save.
#[derive(Debug)]
pub struct SelectionStore {
    path: PathBuf,
    entities: BTreeMap<EntityKind, BTreeSet<RecordId>>,
    migrated_from: Option<u32>,
}

impl SelectionStore {
    pub fn open(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(SELECTION_FILE);
        if !path.exists() {
            return Ok(Self {
                path,
                entities: BTreeMap::new(),
                migrated_from: None,
            });
        }

        let content = fs::read_to_string(&path)?;
        let value: Value =
            serde_json::from_str(&content).map_err(|e| LedgerError::SelectionStore {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let version = match value.get("version") {
            None => None,
            Some(raw) => Some(raw.as_u64().ok_or_else(|| LedgerError::SelectionStore {
                path: path.clone(),
                reason: format!("version must be a non-negative integer, found {raw}"),
            })?),
        };

        let (entities, migrated_from) = match version {
            None | Some(0) => {
                let entities = migrate_v0(&value);
                info!(path = %path.display(), "upgrading legacy selection store");
                (entities, Some(0))
            }
            Some(v) if v > u64::from(SELECTION_VERSION) => {
                return Err(LedgerError::UnsupportedSelectionVersion(
                    u32::try_from(v).unwrap_or(u32::MAX),
                ))
            }
            Some(_) => {
                let file: SelectionFile =
                    serde_json::from_value(value).map_err(|e| LedgerError::SelectionStore {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                (file.entities, None)
            }
        };

        Ok(Self {
            path,
            entities,
            migrated_from,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version the file was upgraded from while loading, if any.
    pub fn migrated_from(&self) -> Option<u32> {
        self.migrated_from
    }

    pub fn stored(&self, kind: EntityKind) -> Option<&BTreeSet<RecordId>> {
        self.entities.get(&kind)
    }

    /// The stored selection, or every visible row when nothing was stored.
    pub fn restore(&self, kind: EntityKind, visible: &[RecordId]) -> BTreeSet<RecordId> {
        match self.entities.get(&kind) {
            Some(ids) => ids.clone(),
            None => visible.iter().cloned().collect(),
        }
    }

    /// Flip one row and persist. Returns whether the row is now selected.
    pub fn toggle(&mut self, kind: EntityKind, id: RecordId, visible: &[RecordId]) -> Result<bool> {
        let mut ids = self.restore(kind, visible);
        let selected = if ids.remove(&id) {
            false
        } else {
            ids.insert(id);
            true
        };
        self.entities.insert(kind, ids);
        self.save()?;
        Ok(selected)
    }

    pub fn select_all(&mut self, kind: EntityKind, ids: &[RecordId]) -> Result<()> {
        self.entities
            .entry(kind)
            .or_default()
            .extend(ids.iter().cloned());
        self.save()
    }

    /// Deselect everything for `kind`.
    pub fn clear(&mut self, kind: EntityKind) -> Result<()> {
        self.entities.insert(kind, BTreeSet::new());
        self.save()
    }

    /// Forget the stored selection so the all-visible default applies again.
    pub fn reset(&mut self, kind: EntityKind) -> Result<()> {
        self.entities.remove(&kind);
        self.save()
    }

    /// Write through a temp file so readers never see a partial store.
    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = SelectionFile {
            version: SELECTION_VERSION,
            entities: self.entities.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        self.migrated_from = None;
        debug!(path = %self.path.display(), "selection saved");
        Ok(())
    }
}

fn migrate_v0(value: &Value) -> BTreeMap<EntityKind, BTreeSet<RecordId>> {
    let mut entities = BTreeMap::new();
    let Some(map) = value.as_object() else {
        warn!("legacy selection store is not an object; starting empty");
        return entities;
    };

    for (key, raw) in map {
        let Some(kind) = EntityKind::from_legacy_storage_key(key) else {
            debug!(key = %key, "ignoring unrelated legacy key");
            continue;
        };
        // The browser stored JSON-encoded strings; tolerate plain arrays too.
        let decoded = match raw {
            Value::String(s) => serde_json::from_str::<Value>(s).unwrap_or(Value::Null),
            other => other.clone(),
        };
        let Some(items) = decoded.as_array() else {
            warn!(key = %key, "legacy selection is not an array; skipping");
            continue;
        };
        let ids: BTreeSet<RecordId> = items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(RecordId::new(s.clone())),
                Value::Number(n) => Some(RecordId::new(n.to_string())),
                _ => None,
            })
            .collect();
        entities.insert(kind, ids);
    }
    entities
}
