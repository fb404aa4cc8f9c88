use rusqlite::Connection;

pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS people (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  email TEXT NOT NULL,
  photo_path TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
  course TEXT NOT NULL,
  date TEXT NOT NULL,
  state TEXT NOT NULL,
  version INTEGER NOT NULL DEFAULT 0,
  PRIMARY KEY (course, date)
);

CREATE TABLE IF NOT EXISTS entries (
  course TEXT NOT NULL,
  date TEXT NOT NULL,
  seq INTEGER NOT NULL,
  person_id TEXT NOT NULL,
  name TEXT NOT NULL,
  status TEXT NOT NULL,
  PRIMARY KEY (course, date, seq),
  FOREIGN KEY (course, date) REFERENCES sessions(course, date) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_entries_person ON entries(person_id);

CREATE TABLE IF NOT EXISTS disputes (
  person_id TEXT PRIMARY KEY,
  course TEXT NOT NULL,
  date TEXT NOT NULL,
  raised_at TEXT NOT NULL
);
"#,
    )
}
