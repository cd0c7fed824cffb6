use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (messages, active_users)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL,
                message_text    TEXT NOT NULL,
                timestamp       TEXT NOT NULL
            );

            CREATE INDEX idx_messages_timestamp
                ON messages(timestamp, id);

            CREATE TABLE active_users (
                session_id      TEXT PRIMARY KEY,
                username        TEXT NOT NULL,
                last_activity   TEXT NOT NULL
            );

            CREATE INDEX idx_active_users_username
                ON active_users(username);

            CREATE INDEX idx_active_users_last_activity
                ON active_users(last_activity);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
