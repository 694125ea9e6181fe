use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "sinifplanim.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;

    // All application state lives in JSON blobs keyed by collection name.
    // The schema carries no other tables.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}
