use crate::audio::{TrackFlags, TrackId};
use crate::Result;
use std::collections::HashMap;

/// Persisted per-track flags, keyed by track identity
pub trait PreferenceStore {
    /// Everything stored. Rows that can't be read are left out, so their
    /// tracks fall back to category defaults.
    fn load_flags(&self) -> Result<HashMap<TrackId, TrackFlags>>;
    fn save_flags(&mut self, id: &TrackId, flags: &TrackFlags) -> Result<()>;
}

/// Keeps flags for the lifetime of the process only
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    flags: HashMap<TrackId, TrackFlags>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load_flags(&self) -> Result<HashMap<TrackId, TrackFlags>> {
        Ok(self.flags.clone())
    }

    fn save_flags(&mut self, id: &TrackId, flags: &TrackFlags) -> Result<()> {
        self.flags.insert(id.clone(), *flags);
        Ok(())
    }
}

#[cfg(feature = "prefs")]
pub use sqlite::SqlitePreferenceStore;

#[cfg(feature = "prefs")]
mod sqlite {
    use super::PreferenceStore;
    use crate::audio::{TrackFlags, TrackId};
    use crate::Result;
    use chrono::Utc;
    use rusqlite::{params, Connection, Row};
    use std::collections::HashMap;
    use std::path::Path;
    use tracing::{debug, warn};

    pub struct SqlitePreferenceStore {
        conn: Connection,
    }

    impl SqlitePreferenceStore {
        pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
            if let Some(parent) = db_path.as_ref().parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let conn = Connection::open(db_path)?;
            let store = Self { conn };
            store.initialize_tables()?;
            Ok(store)
        }

        pub fn in_memory() -> Result<Self> {
            let store = Self {
                conn: Connection::open_in_memory()?,
            };
            store.initialize_tables()?;
            Ok(store)
        }

        fn initialize_tables(&self) -> Result<()> {
            self.conn.execute(
                "CREATE TABLE IF NOT EXISTS track_flags (
                    track_id TEXT PRIMARY KEY,
                    allow_day INTEGER,
                    allow_night INTEGER,
                    allow_winter INTEGER,
                    allow_combat INTEGER,
                    allow_anytime INTEGER,
                    updated_at TEXT NOT NULL
                )",
                [],
            )?;
            Ok(())
        }
    }

    // 0/1 only; anything else marks the row as corrupt
    fn flag(row: &Row, index: usize) -> rusqlite::Result<Option<bool>> {
        let value: Option<i64> = row.get(index)?;
        Ok(match value {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        })
    }

    fn row_to_flags(row: &Row) -> rusqlite::Result<(String, Option<TrackFlags>)> {
        let id: String = row.get(0)?;
        let flags = match (flag(row, 1)?, flag(row, 2)?, flag(row, 3)?, flag(row, 4)?, flag(row, 5)?) {
            (Some(allow_day), Some(allow_night), Some(allow_winter), Some(allow_combat), Some(allow_anytime)) => {
                Some(TrackFlags {
                    allow_day,
                    allow_night,
                    allow_winter,
                    allow_combat,
                    allow_anytime,
                })
            }
            _ => None,
        };
        Ok((id, flags))
    }

    impl PreferenceStore for SqlitePreferenceStore {
        fn load_flags(&self) -> Result<HashMap<TrackId, TrackFlags>> {
            let mut stmt = self.conn.prepare(
                "SELECT track_id, allow_day, allow_night, allow_winter, allow_combat, allow_anytime
                 FROM track_flags",
            )?;

            let mut flags = HashMap::new();
            for row in stmt.query_map([], row_to_flags)? {
                match row {
                    Ok((id, Some(track_flags))) => {
                        flags.insert(TrackId::new(id), track_flags);
                    }
                    Ok((id, None)) => warn!("Corrupt flags for {}, using category defaults", id),
                    Err(e) => warn!("Unreadable flags row: {}", e),
                }
            }

            debug!("Loaded flags for {} tracks", flags.len());
            Ok(flags)
        }

        fn save_flags(&mut self, id: &TrackId, flags: &TrackFlags) -> Result<()> {
            self.conn.execute(
                "INSERT OR REPLACE INTO track_flags
                 (track_id, allow_day, allow_night, allow_winter, allow_combat, allow_anytime, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.as_str(),
                    flags.allow_day,
                    flags.allow_night,
                    flags.allow_winter,
                    flags.allow_combat,
                    flags.allow_anytime,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use tempfile::TempDir;

        #[test]
        fn test_flags_survive_reopen() {
            let tmp = TempDir::new().unwrap();
            let path = tmp.path().join("prefs").join("flags.db");
            let id = TrackId::new("Music/Combat/A.B");
            let flags = TrackFlags {
                allow_day: true,
                allow_combat: true,
                ..TrackFlags::default()
            };

            {
                let mut store = SqlitePreferenceStore::new(&path).unwrap();
                store.save_flags(&id, &flags).unwrap();
            }

            let store = SqlitePreferenceStore::new(&path).unwrap();
            let loaded = store.load_flags().unwrap();
            assert_eq!(loaded.get(&id), Some(&flags));
        }

        #[test]
        fn test_corrupt_rows_are_skipped() {
            let mut store = SqlitePreferenceStore::in_memory().unwrap();
            store
                .save_flags(&TrackId::new("good"), &TrackFlags::default())
                .unwrap();
            store
                .conn
                .execute(
                    "INSERT INTO track_flags VALUES ('bad', 7, NULL, 0, 0, 0, 'now')",
                    [],
                )
                .unwrap();

            let loaded = store.load_flags().unwrap();
            assert_eq!(loaded.len(), 1);
            assert!(loaded.contains_key(&TrackId::new("good")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_overwrites() {
        let mut store = MemoryPreferenceStore::new();
        let id = TrackId::new("x");
        store.save_flags(&id, &TrackFlags::default()).unwrap();
        let changed = TrackFlags {
            allow_anytime: true,
            ..TrackFlags::default()
        };
        store.save_flags(&id, &changed).unwrap();
        assert_eq!(store.load_flags().unwrap()[&id], changed);
    }
}
