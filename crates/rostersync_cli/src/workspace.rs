//! On-disk workspace used by the CLI.
//!
//! A workspace directory holds:
//! - `rostersync.json`: optional settings
//! - `local/<kind>.json`: one JSON array per local table
//! - `workbook.json`: the remote workbook (sheet name to rows)
//! - `deletions.json`: the deletion ledger

use rostersync_engine::{
    DeletionLedger, MemoryLocalStore, MemorySheet, MemoryStores, ReplacePolicy, RetryConfig,
    SyncConfig, SyncOrchestrator, Workbook,
};
use rostersync_model::{Entity, EntityKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Settings file name.
pub const SETTINGS_FILE: &str = "rostersync.json";
/// Remote workbook file name.
pub const WORKBOOK_FILE: &str = "workbook.json";
/// Deletion ledger file name.
pub const LEDGER_FILE: &str = "deletions.json";

/// Settings read from `rostersync.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Spreadsheet id; sync commands refuse to run without it.
    pub spreadsheet_id: Option<String>,
    /// Attempts per remote call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Background sync interval in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_interval_secs: Option<u64>,
    /// Deletion ledger retention in days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_retention_days: Option<u64>,
    /// Per-kind full-sync replace policies.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub replace_policies: BTreeMap<EntityKind, ReplacePolicy>,
}

impl Settings {
    /// Builds the engine configuration.
    pub fn to_config(&self) -> SyncConfig {
        let mut config = match &self.spreadsheet_id {
            Some(id) => SyncConfig::new(id.clone()),
            None => SyncConfig::default(),
        };
        if let Some(attempts) = self.max_attempts {
            config = config.with_retry(RetryConfig::new(attempts));
        }
        if let Some(secs) = self.sync_interval_secs {
            config = config.with_sync_interval(Duration::from_secs(secs));
        }
        if let Some(days) = self.ledger_retention_days {
            config = config.with_ledger_retention(Duration::from_secs(days * 24 * 60 * 60));
        }
        for (kind, policy) in &self.replace_policies {
            config = config.with_replace_policy(*kind, *policy);
        }
        config
    }
}

/// Local tables, remote workbook and settings loaded from one directory.
pub struct Workspace {
    root: PathBuf,
    settings: Settings,
    stores: MemoryStores,
}

impl Workspace {
    /// Loads the workspace at `root`. Missing files read as empty.
    pub fn open(root: &Path) -> Result<Self, Box<dyn Error>> {
        let settings: Settings = read_json(&root.join(SETTINGS_FILE))?.unwrap_or_default();
        let workbook: Workbook = read_json(&root.join(WORKBOOK_FILE))?.unwrap_or_default();

        let stores = MemoryStores {
            sheet: Arc::new(MemorySheet::from_workbook(workbook)),
            guests: Arc::new(load_table(root)?),
            volunteers: Arc::new(load_table(root)?),
            jobs: Arc::new(load_table(root)?),
            job_types: Arc::new(load_table(root)?),
            venues: Arc::new(load_table(root)?),
        };
        debug!(root = %root.display(), "opened workspace");

        Ok(Self {
            root: root.to_path_buf(),
            settings,
            stores,
        })
    }

    /// Workspace directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loaded settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Local tables and remote workbook.
    pub fn stores(&self) -> &MemoryStores {
        &self.stores
    }

    /// Opens the ledger file of this workspace.
    pub fn ledger(&self) -> DeletionLedger {
        DeletionLedger::open(self.root.join(LEDGER_FILE))
    }

    /// Builds an orchestrator over this workspace.
    pub fn orchestrator(&self) -> SyncOrchestrator {
        SyncOrchestrator::new(
            self.settings.to_config(),
            self.stores.store_set(),
            Arc::new(self.ledger()),
        )
    }

    /// Writes local tables and the workbook back to disk.
    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        save_table(&self.root, &self.stores.guests)?;
        save_table(&self.root, &self.stores.volunteers)?;
        save_table(&self.root, &self.stores.jobs)?;
        save_table(&self.root, &self.stores.job_types)?;
        save_table(&self.root, &self.stores.venues)?;
        write_json(&self.root.join(WORKBOOK_FILE), &self.stores.sheet.workbook())?;
        debug!(root = %self.root.display(), "saved workspace");
        Ok(())
    }

    /// Writes `settings` to the settings file.
    pub fn write_settings(root: &Path, settings: &Settings) -> Result<(), Box<dyn Error>> {
        write_json(&root.join(SETTINGS_FILE), settings)
    }
}

fn table_path<T: Entity>(root: &Path) -> PathBuf {
    root.join("local")
        .join(format!("{}.json", T::SHEET.to_ascii_lowercase()))
}

fn load_table<T: Entity + DeserializeOwned>(
    root: &Path,
) -> Result<MemoryLocalStore<T>, Box<dyn Error>> {
    let items: Vec<T> = read_json(&table_path::<T>(root))?.unwrap_or_default();
    Ok(MemoryLocalStore::from_items(items))
}

fn save_table<T: Entity + Serialize>(
    root: &Path,
    store: &MemoryLocalStore<T>,
) -> Result<(), Box<dyn Error>> {
    write_json(&table_path::<T>(root), &store.snapshot())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, Box<dyn Error>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
    Ok(Some(value))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostersync_engine::LocalStore;
    use rostersync_model::{Guest, Identity, RemoteId};

    #[test]
    fn settings_map_onto_config() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "spreadsheet_id": "abc",
                "max_attempts": 5,
                "ledger_retention_days": 7,
                "replace_policies": { "volunteer": "replace", "guest": "preserve_local_only" }
            }"#,
        )
        .unwrap();

        let config = settings.to_config();
        assert!(config.is_configured());
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.ledger_retention, Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(config.replace_policy(EntityKind::Volunteer), ReplacePolicy::Replace);
        assert_eq!(
            config.replace_policy(EntityKind::Guest),
            ReplacePolicy::PreserveLocalOnly
        );
    }

    #[test]
    fn empty_directory_opens_unconfigured() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        assert!(!workspace.settings().to_config().is_configured());
        assert!(workspace.stores().guests.is_empty());
    }

    #[tokio::test]
    async fn sync_round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        Workspace::write_settings(
            dir.path(),
            &Settings {
                spreadsheet_id: Some("sheet".into()),
                ..Settings::default()
            },
        )
        .unwrap();

        let workspace = Workspace::open(dir.path()).unwrap();
        let mut guest = Guest::new("Alice", "Main Hall", 2);
        guest.set_identity(Identity::Remote(RemoteId::from(5)));
        workspace.stores().guests.insert(&guest).unwrap();
        workspace.orchestrator().backup().await.unwrap();
        workspace.save().unwrap();

        // A fresh workspace sees the uploaded row and the local table.
        let reopened = Workspace::open(dir.path()).unwrap();
        assert_eq!(reopened.stores().guests.len(), 1);
        assert_eq!(reopened.stores().sheet.rows("Guests").len(), 2);
        assert!(dir.path().join("local").join("guests.json").exists());
    }
}
