use crate::error::StoreError;
use crate::ledger::EventJournal;
use crate::store::RegistryState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_FILE: &str = "flightsurety_snapshot.json";
pub const SNAPSHOT_VERSION: u8 = 1;

#[derive(Clone, Debug, Deserialize)]
pub struct PersistedSnapshot {
    pub version: u8,
    pub state: RegistryState,
    pub journal: EventJournal,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u8,
    state: &'a RegistryState,
    journal: &'a EventJournal,
}

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            path: data_dir.as_ref().join(SNAPSHOT_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<PersistedSnapshot>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path)?;
        let snap = serde_json::from_slice::<PersistedSnapshot>(&data)?;
        Ok(Some(snap))
    }

    /// Write-then-rename so a crash never leaves a torn snapshot behind.
    pub fn save(&self, state: &RegistryState, journal: &EventJournal) -> Result<(), StoreError> {
        let snap = SnapshotRef {
            version: SNAPSHOT_VERSION,
            state,
            journal,
        };
        let data = serde_json::to_vec_pretty(&snap)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
