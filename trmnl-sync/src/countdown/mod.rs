//! File-backed store for user defined countdowns.
//!
//! The whole map is rewritten to disk after every mutation. All mutations run
//! under a single lock so concurrent requests cannot lose each other's writes.

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use utoipa::ToSchema;

pub mod api;
pub mod web;

/// Format of `target_date` values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default threshold for [`CountdownStore::cleanup_expired`].
pub const DEFAULT_EXPIRY_THRESHOLD_DAYS: i64 = -30;

/// A countdown as persisted on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownEntry {
    pub id: String,
    pub title: String,
    pub target_date: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A countdown together with the days left until its target date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Countdown {
    /// Unique identifier
    pub id: String,
    /// Countdown title
    pub title: String,
    /// Target date, `YYYY-MM-DD`
    pub target_date: String,
    /// Creation time, ISO-8601 UTC
    pub created_at: String,
    /// Time of the last update, ISO-8601 UTC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Whole days until the target date, negative once it has passed
    pub days_remaining: i64,
}

impl Countdown {
    fn from_entry(entry: &CountdownEntry, today: NaiveDate) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            target_date: entry.target_date.clone(),
            created_at: entry.created_at.clone(),
            updated_at: entry.updated_at.clone(),
            days_remaining: days_remaining(&entry.target_date, today),
        }
    }
}

/// Error type for countdown store operations.
#[derive(Debug, thiserror::Error)]
pub enum CountdownError {
    #[error("Countdown with ID {0} not found")]
    NotFound(String),
    #[error("Failed to persist countdowns to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize countdowns: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Whole days from `today` until `target_date`.
///
/// A date that does not parse as `YYYY-MM-DD` counts as zero days remaining.
pub fn days_remaining(target_date: &str, today: NaiveDate) -> i64 {
    match NaiveDate::parse_from_str(target_date, DATE_FORMAT) {
        Ok(date) => (date - today).num_days(),
        Err(err) => {
            tracing::warn!("Invalid target date '{}': {}", target_date, err);
            0
        }
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn persistence_error(path: &Path) -> impl FnOnce(std::io::Error) -> CountdownError + use<> {
    let path = path.to_path_buf();
    move |source| CountdownError::Persistence { path, source }
}

type Entries = BTreeMap<String, CountdownEntry>;

pub struct CountdownStore {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl std::fmt::Debug for CountdownStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CountdownStore {
    /// Opens the store backed by the JSON file at `path`.
    ///
    /// A missing file starts an empty store and writes it out. An unreadable or
    /// corrupt file is logged and also starts empty.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CountdownError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(persistence_error(dir))?;
                tracing::info!("Created data directory: {}", dir.display());
            }
        }

        let (entries, existed) = Self::load(&path).await;
        let store = Self {
            path,
            entries: Mutex::new(entries),
        };

        if !existed {
            let entries = store.entries.lock().await;
            match store.persist(&entries).await {
                Ok(()) => tracing::info!("Created new countdown data file"),
                Err(err) => tracing::error!("Error creating countdown data file: {}", err),
            }
        }
        Ok(store)
    }

    async fn load(path: &Path) -> (Entries, bool) {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return (Entries::new(), false);
            }
            Err(err) => {
                tracing::error!("Error loading countdown data: {}", err);
                return (Entries::new(), true);
            }
        };

        match serde_json::from_str::<Entries>(&contents) {
            Ok(entries) => {
                tracing::info!(
                    "Loaded {} countdowns from {}",
                    entries.len(),
                    path.display()
                );
                (entries, true)
            }
            Err(err) => {
                tracing::error!("Error loading countdown data: {}", err);
                (Entries::new(), true)
            }
        }
    }

    /// Rewrites the backing file. Callers hold the entries lock.
    ///
    /// The map goes to a temporary file that is synced and then renamed over
    /// the data file, so a failed write leaves the previous contents intact.
    async fn persist(&self, entries: &Entries) -> Result<(), CountdownError> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(persistence_error(&tmp_path))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(persistence_error(&tmp_path))?;
        file.sync_all()
            .await
            .map_err(persistence_error(&tmp_path))?;
        drop(file);

        if let Err(err) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(CountdownError::Persistence {
                path: self.path.clone(),
                source: err,
            });
        }
        tracing::debug!("Countdown data saved successfully");
        Ok(())
    }

    async fn persist_logged(&self, entries: &Entries) -> Result<(), CountdownError> {
        self.persist(entries).await.inspect_err(|err| {
            tracing::error!("Error saving countdown data: {}", err);
        })
    }

    /// Adds a countdown and returns its generated ID.
    #[tracing::instrument(skip(self))]
    pub async fn add(&self, title: &str, target_date: &str) -> Result<String, CountdownError> {
        let id = uuid::Uuid::new_v4().to_string();
        let entry = CountdownEntry {
            id: id.clone(),
            title: title.to_string(),
            target_date: target_date.to_string(),
            created_at: now_timestamp(),
            updated_at: None,
        };

        let mut entries = self.entries.lock().await;
        entries.insert(id.clone(), entry);
        self.persist_logged(&entries).await?;

        tracing::info!("Added countdown: {} (ID: {})", title, id);
        Ok(id)
    }

    /// Replaces title and target date of an existing countdown.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: &str,
        title: &str,
        target_date: &str,
    ) -> Result<(), CountdownError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| CountdownError::NotFound(id.to_string()))?;
        entry.title = title.to_string();
        entry.target_date = target_date.to_string();
        entry.updated_at = Some(now_timestamp());
        self.persist_logged(&entries).await?;

        tracing::info!("Updated countdown: {} (ID: {})", title, id);
        Ok(())
    }

    /// Removes a countdown.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), CountdownError> {
        let mut entries = self.entries.lock().await;
        let removed = entries
            .remove(id)
            .ok_or_else(|| CountdownError::NotFound(id.to_string()))?;
        self.persist_logged(&entries).await?;

        tracing::info!("Deleted countdown: {} (ID: {})", removed.title, id);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Countdown> {
        let entries = self.entries.lock().await;
        entries
            .get(id)
            .map(|entry| Countdown::from_entry(entry, today()))
    }

    /// All countdowns, soonest first.
    pub async fn list_all(&self) -> Vec<Countdown> {
        let today = today();
        let entries = self.entries.lock().await;
        let mut countdowns: Vec<Countdown> = entries
            .values()
            .map(|entry| Countdown::from_entry(entry, today))
            .collect();
        countdowns.sort_by_key(|countdown| countdown.days_remaining);
        countdowns
    }

    /// Countdowns whose target date has not passed yet.
    pub async fn list_active(&self) -> Vec<Countdown> {
        self.list_all()
            .await
            .into_iter()
            .filter(|countdown| countdown.days_remaining >= 0)
            .collect()
    }

    /// Removes countdowns with fewer than `threshold_days` days remaining and
    /// returns how many were removed.
    #[tracing::instrument(skip(self))]
    pub async fn cleanup_expired(&self, threshold_days: i64) -> Result<usize, CountdownError> {
        let today = today();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| days_remaining(&entry.target_date, today) >= threshold_days);
        let removed = before - entries.len();

        if removed > 0 {
            self.persist_logged(&entries).await?;
            tracing::info!("Cleaned up {} expired countdowns", removed);
        }
        Ok(removed)
    }
}
