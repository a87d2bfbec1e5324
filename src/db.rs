//! # Snapshot Store
//!
//! SQLite persistence of the last computed preference model.
//!
//! ## Schema
//!
//! - `meta`: key/value pairs (`user`, `model_built`)
//! - `tag_stats`: one row per modeled tag, keyed by the rendered tag, with the
//!   tag's class, name, role and main flag in their own columns
//! - `seen`: ids of every title in the history the model was built from
//!
//! The whole snapshot is rewritten in one transaction on every save. Databases
//! written before the tag columns existed lose their cached model on open (the
//! user is kept) and the model is rebuilt on the next run.

use crate::catalog::RecordId;
use crate::model::{PreferenceModel, TagStatistic};
use crate::tags::{FeatureTag, TagClass};
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Bumped whenever the snapshot tables change shape.
const SCHEMA_VERSION: i32 = 2;

/// Everything persisted between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// User whose history the model was built from.
    pub user: Option<String>,
    /// `None` until a model has been built at least once.
    pub model: Option<PreferenceModel>,
}

/// Handle to the snapshot database.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (and if needed creates) the snapshot database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open snapshot database at {}", path.display()))?;
        debug!("Opened snapshot database at {}", path.display());
        Self::with_connection(conn)
    }

    /// In-memory store, nothing survives the process.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .context("Failed to create snapshot schema")?;

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .context("Failed to read snapshot schema version")?;
        if version < SCHEMA_VERSION {
            debug!("Upgrading snapshot schema from version {version} to {SCHEMA_VERSION}");
            conn.execute_batch(
                "DROP TABLE IF EXISTS tag_stats;
                DROP TABLE IF EXISTS seen;
                DELETE FROM meta WHERE key = 'model_built';",
            )
            .context("Failed to discard outdated snapshot tables")?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .context("Failed to store snapshot schema version")?;
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tag_stats (
                tag     TEXT PRIMARY KEY,
                class   TEXT NOT NULL,
                name    TEXT NOT NULL,
                role    TEXT,
                main    INTEGER NOT NULL DEFAULT 0,
                samples INTEGER NOT NULL,
                mean    REAL NOT NULL,
                stdev   REAL NOT NULL
            );
            CREATE TABLE IF NOT EXISTS seen (
                id INTEGER PRIMARY KEY
            );",
        )
        .context("Failed to create snapshot schema")?;
        Ok(Self { conn })
    }

    /// Reads the stored snapshot. A fresh database yields an empty snapshot.
    pub fn load(&self) -> Result<Snapshot> {
        let user = self.meta("user")?;
        let built = self.meta("model_built")?.is_some();
        let model = if built { Some(self.load_model()?) } else { None };
        Ok(Snapshot { user, model })
    }

    fn meta(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .with_context(|| format!("Failed to read `{key}` from snapshot metadata"))
    }

    fn load_model(&self) -> Result<PreferenceModel> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag, class, name, role, main, samples, mean, stdev FROM tag_stats")
            .context("Invalid SQL statement when SELECTing tag statistics")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, f64>(7)?,
                ))
            })
            .context("Cannot query tag statistics")?;

        let mut stats = Vec::new();
        for row in rows {
            let (key, class, name, role, main, samples, mean, stdev) =
                row.context("Queried tag statistic unwrap failed")?;
            let class = TagClass::from_prefix(&class)
                .ok_or_else(|| anyhow!("Unknown tag class `{class}` stored for {key}"))?;
            let tag = FeatureTag::from_parts(class, name, role, main);
            let samples = usize::try_from(samples)
                .with_context(|| format!("Negative sample count stored for {key}"))?;
            stats.push(TagStatistic {
                tag,
                samples,
                mean,
                stdev,
            });
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id FROM seen")
            .context("Invalid SQL statement when SELECTing seen ids")?;
        let seen = stmt
            .query_map([], |row| row.get::<_, RecordId>(0))
            .context("Cannot query seen ids")?
            .collect::<rusqlite::Result<Vec<RecordId>>>()
            .context("Queried seen id unwrap failed")?;

        Ok(PreferenceModel::from_parts(stats, seen))
    }

    /// Replaces the stored snapshot with `snapshot`.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - User and model to store. A `None` model clears the
    ///   cached statistics so the next run rebuilds them.
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok once the transaction committed. On error nothing
    ///   is changed on disk.
    ///
    /// # Behavior
    ///
    /// - Deletes every row of `meta`, `tag_stats` and `seen`
    /// - Writes the user, then a `model_built` marker, one row per tag
    ///   statistic and one row per seen id
    /// - An empty model still writes the marker, so it is not rebuilt
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM meta", [])?;
        tx.execute("DELETE FROM tag_stats", [])?;
        tx.execute("DELETE FROM seen", [])?;

        if let Some(user) = &snapshot.user {
            tx.execute(
                "INSERT INTO meta (key, value) VALUES ('user', ?1)",
                [user],
            )
            .context("Failed to store user")?;
        }

        if let Some(model) = &snapshot.model {
            tx.execute("INSERT INTO meta (key, value) VALUES ('model_built', '1')", [])
                .context("Failed to store model marker")?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO tag_stats (tag, class, name, role, main, samples, mean, stdev)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for stat in model.statistics() {
                    let samples = i64::try_from(stat.samples)
                        .with_context(|| format!("Sample count overflow for {}", stat.tag))?;
                    let tag = &stat.tag;
                    stmt.execute(params![
                        tag.key(),
                        tag.class().prefix(),
                        tag.name(),
                        tag.role(),
                        tag.is_main(),
                        samples,
                        stat.mean,
                        stat.stdev
                    ])
                        .with_context(|| {
                            format!("Invalid SQL statement when INSERTing statistic: {stat:?}")
                        })?;
                }

                let mut stmt = tx.prepare("INSERT INTO seen (id) VALUES (?1)")?;
                for id in model.seen() {
                    stmt.execute([id])
                        .with_context(|| format!("Failed to store seen id {id}"))?;
                }
            }
        }

        tx.commit().context("Committing snapshot transaction failed")?;
        info!(
            "Saved snapshot ({} tags)",
            snapshot.model.as_ref().map_or(0, PreferenceModel::len)
        );
        Ok(())
    }
}
