use chrono::{DateTime, SubsecRound, Utc};
use guestchat_types::models::{ChatMessage, HeartbeatStatus, PresenceEntry};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use crate::models::{ActiveUserRow, MessageRow, format_timestamp};
use crate::{Database, Result};

/// Result of [`Database::claim_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The session was new and now owns the requested name.
    Created(PresenceEntry),
    /// The session already had an entry; nothing was written.
    Existing(PresenceEntry),
    /// Some stored entry already carries the requested name.
    NameTaken,
}

impl Database {
    // -- Messages --

    pub fn insert_message(
        &self,
        username: &str,
        message_text: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage> {
        let timestamp = format_timestamp(now);
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (username, message_text, timestamp) VALUES (?1, ?2, ?3)",
                params![username, message_text, &timestamp],
            )?;
            let row = MessageRow {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                message_text: message_text.to_string(),
                timestamp,
            };
            row.try_into()
        })
    }

    /// Full history, oldest first. Equal timestamps keep insertion order.
    pub fn list_messages(&self) -> Result<Vec<ChatMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, message_text, timestamp
                 FROM messages
                 ORDER BY timestamp ASC, id ASC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        message_text: row.get(2)?,
                        timestamp: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(ChatMessage::try_from).collect()
        })
    }

    // -- Active users --

    pub fn get_active_user(&self, session_id: &str) -> Result<Option<PresenceEntry>> {
        self.with_conn(|conn| {
            query_active_user(conn, session_id)?
                .map(PresenceEntry::try_from)
                .transpose()
        })
    }

    /// Insert-if-absent for a new session under a candidate name.
    ///
    /// Runs as one `BEGIN IMMEDIATE` transaction, so the session lookup, the
    /// name check and the insert cannot interleave with another writer.
    pub fn claim_session(
        &self,
        session_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let now = now.trunc_subsecs(6);
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(row) = query_active_user(&tx, session_id)? {
                return Ok(ClaimOutcome::Existing(row.try_into()?));
            }

            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM active_users WHERE username = ?1)",
                [username],
                |row| row.get(0),
            )?;
            if taken {
                return Ok(ClaimOutcome::NameTaken);
            }

            tx.execute(
                "INSERT INTO active_users (session_id, username, last_activity) VALUES (?1, ?2, ?3)",
                params![session_id, username, format_timestamp(now)],
            )?;
            tx.commit()?;

            Ok(ClaimOutcome::Created(PresenceEntry {
                session_id: session_id.to_string(),
                display_name: username.to_string(),
                last_seen_at: now,
            }))
        })
    }

    /// Overwrite the name and refresh `last_activity`, creating the row if
    /// the session is unknown.
    pub fn upsert_active_user(
        &self,
        session_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<HeartbeatStatus> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existed: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM active_users WHERE session_id = ?1)",
                [session_id],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO active_users (session_id, username, last_activity) VALUES (?1, ?2, ?3)
                 ON CONFLICT(session_id) DO UPDATE SET
                    username = excluded.username,
                    last_activity = excluded.last_activity",
                params![session_id, username, format_timestamp(now)],
            )?;
            tx.commit()?;

            Ok(if existed {
                HeartbeatStatus::Updated
            } else {
                HeartbeatStatus::Created
            })
        })
    }

    /// Rows with `last_activity` strictly after `cutoff`.
    pub fn count_active_since(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM active_users WHERE last_activity > ?1",
                [format_timestamp(cutoff)],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Deletes rows with `last_activity` at or before `cutoff`.
    pub fn delete_inactive_until(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM active_users WHERE last_activity <= ?1",
                [format_timestamp(cutoff)],
            )?;
            Ok(deleted)
        })
    }
}

fn query_active_user(conn: &Connection, session_id: &str) -> Result<Option<ActiveUserRow>> {
    let mut stmt = conn.prepare(
        "SELECT session_id, username, last_activity FROM active_users WHERE session_id = ?1",
    )?;

    let row = stmt
        .query_row([session_id], |row| {
            Ok(ActiveUserRow {
                session_id: row.get(0)?,
                username: row.get(1)?,
                last_activity: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn duplicate_session_insert_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        let insert = |conn: &mut Connection| -> Result<usize> {
            Ok(conn.execute(
                "INSERT INTO active_users (session_id, username, last_activity) VALUES ('s1', 'a', 'x')",
                [],
            )?)
        };

        db.with_conn_mut(insert).unwrap();
        let err = db.with_conn_mut(insert).unwrap_err();
        assert!(err.is_conflict(), "expected conflict, got {err:?}");
    }

    #[test]
    fn other_constraint_failures_are_not_conflicts() {
        let db = Database::open_in_memory().unwrap();

        let err = db
            .with_conn_mut(|conn| {
                Ok(conn.execute(
                    "INSERT INTO active_users (session_id, username, last_activity) VALUES ('s1', NULL, 'x')",
                    [],
                )?)
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)), "NOT NULL gave {err:?}");

        db.with_conn_mut(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER no_bob BEFORE INSERT ON active_users
                 WHEN NEW.username = 'bob'
                 BEGIN SELECT RAISE(ABORT, 'bob is banned'); END;",
            )?;
            Ok(())
        })
        .unwrap();
        let err = db.claim_session("s2", "bob", t0()).unwrap_err();
        assert!(!err.is_conflict(), "trigger abort gave {err:?}");
    }

    #[test]
    fn claim_creates_then_reports_existing() {
        let db = Database::open_in_memory().unwrap();

        let first = db.claim_session("s1", "Гость-1000", t0()).unwrap();
        assert!(matches!(first, ClaimOutcome::Created(ref e) if e.display_name == "Гость-1000"));

        let later = t0() + Duration::minutes(1);
        match db.claim_session("s1", "Гость-2000", later).unwrap() {
            ClaimOutcome::Existing(entry) => {
                assert_eq!(entry.display_name, "Гость-1000");
                assert_eq!(entry.last_seen_at, t0());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn claim_rejects_taken_name() {
        let db = Database::open_in_memory().unwrap();
        db.claim_session("s1", "Гость-1000", t0()).unwrap();

        let outcome = db.claim_session("s2", "Гость-1000", t0()).unwrap();
        assert_eq!(outcome, ClaimOutcome::NameTaken);
        assert!(db.get_active_user("s2").unwrap().is_none());
    }

    #[test]
    fn upsert_reports_created_then_updated() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.upsert_active_user("s1", "a", t0()).unwrap(), HeartbeatStatus::Created);
        let later = t0() + Duration::seconds(30);
        assert_eq!(db.upsert_active_user("s1", "b", later).unwrap(), HeartbeatStatus::Updated);

        let entry = db.get_active_user("s1").unwrap().unwrap();
        assert_eq!(entry.display_name, "b");
        assert_eq!(entry.last_seen_at, later);
    }

    #[test]
    fn count_and_delete_split_on_cutoff() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_active_user("old", "a", t0()).unwrap();
        db.upsert_active_user("edge", "b", t0() + Duration::seconds(10)).unwrap();
        db.upsert_active_user("new", "c", t0() + Duration::seconds(20)).unwrap();

        let cutoff = t0() + Duration::seconds(10);
        assert_eq!(db.count_active_since(cutoff).unwrap(), 1);
        assert_eq!(db.delete_inactive_until(cutoff).unwrap(), 2);
        assert_eq!(db.delete_inactive_until(cutoff).unwrap(), 0);
        assert!(db.get_active_user("new").unwrap().is_some());
    }

    #[test]
    fn messages_come_back_in_insertion_order_on_equal_timestamps() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message("A", "hi", t0()).unwrap();
        db.insert_message("B", "yo", t0()).unwrap();
        db.insert_message("C", "first", t0() - Duration::seconds(1)).unwrap();

        let bodies: Vec<_> = db
            .list_messages()
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, ["first", "hi", "yo"]);
    }

    #[test]
    fn file_database_serves_reads_from_reader_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");

        {
            let db = Database::open(&path).unwrap();
            let msg = db.insert_message("A", "persisted", t0()).unwrap();
            assert_eq!(msg.id, 1);
            assert_eq!(db.list_messages().unwrap().len(), 1);
        }

        let reopened = Database::open(&path).unwrap();
        let messages = reopened.list_messages().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "persisted");
        assert_eq!(messages[0].created_at, t0());
    }

    #[test]
    fn corrupt_rows_surface_as_errors() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (username, message_text, timestamp) VALUES ('A', 'x', 'garbage')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let err = db.list_messages().unwrap_err();
        assert!(matches!(err, StoreError::CorruptRow { .. }));
    }
}
