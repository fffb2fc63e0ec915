use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "admissions.sqlite3";

/// A named key-value slot holding one serialized document per key.
pub trait SlotStorage {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS slots(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub struct SqliteSlots {
    conn: Connection,
}

impl SqliteSlots {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(SqliteSlots {
            conn: open_db(workspace)?,
        })
    }
}

impl SlotStorage for SqliteSlots {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM slots WHERE key = ?", [key], |r| r.get(0))
            .optional()
            .with_context(|| format!("failed to read slot {key}"))
    }

    fn write(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO slots(key, value, updated_at) VALUES(?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                (key, value, &now),
            )
            .with_context(|| format!("failed to write slot {key}"))?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn slots_overwrite_and_survive_reopen() {
        let workspace = temp_dir("admissiond-slots");
        {
            let mut slots = SqliteSlots::open(&workspace).expect("open");
            assert_eq!(slots.read("submittedStudents").expect("read"), None);
            slots.write("submittedStudents", "[1]").expect("write");
            slots.write("submittedStudents", "[1,2]").expect("overwrite");
        }
        let slots = SqliteSlots::open(&workspace).expect("reopen");
        assert_eq!(
            slots.read("submittedStudents").expect("read").as_deref(),
            Some("[1,2]")
        );
        let _ = std::fs::remove_dir_all(workspace);
    }
}
