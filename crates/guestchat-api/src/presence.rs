//! Guest presence: name allocation, heartbeats, online counting and reaping.
//!
//! Nothing is cached between calls. Every operation reads or writes the
//! database directly, so any number of service instances can share one
//! store.

use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use guestchat_db::{ClaimOutcome, Database};
use guestchat_types::models::{HeartbeatStatus, PresenceEntry, Registration};

use crate::clock::{Clock, SystemClock};
use crate::error::{ChatError, require_text};

/// An entry is online while `now - last_seen_at` is below this many seconds.
pub const LIVENESS_WINDOW_SECS: i64 = 5 * 60;

pub const GUEST_NAME_PREFIX: &str = "Гость";
pub const GUEST_SUFFIX_RANGE: RangeInclusive<u16> = 1000..=9999;
pub const DEFAULT_MAX_NAME_ATTEMPTS: u32 = 256;

pub const MAX_SESSION_ID_CHARS: usize = 255;
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;

/// Draws the numeric suffix of a guest name.
pub trait SuffixDraw: Send + Sync {
    fn draw(&self) -> u16;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSuffix;

impl SuffixDraw for RandomSuffix {
    fn draw(&self) -> u16 {
        rand::rng().random_range(GUEST_SUFFIX_RANGE)
    }
}

pub fn guest_name(suffix: u16) -> String {
    format!("{}-{}", GUEST_NAME_PREFIX, suffix)
}

#[derive(Clone)]
pub struct PresenceTracker {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    suffixes: Arc<dyn SuffixDraw>,
    max_name_attempts: u32,
}

impl PresenceTracker {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
            suffixes: Arc::new(RandomSuffix),
            max_name_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_suffix_draw(mut self, suffixes: Arc<dyn SuffixDraw>) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn with_max_name_attempts(mut self, attempts: u32) -> Self {
        self.max_name_attempts = attempts.max(1);
        self
    }

    /// Returns the session's existing name, or allocates a fresh guest name.
    ///
    /// An existing entry is returned as-is even if it has expired and not
    /// been reaped yet; its `last_seen_at` is not refreshed.
    pub fn register(&self, session_id: &str) -> Result<Registration, ChatError> {
        require_text("session_id", session_id, MAX_SESSION_ID_CHARS)?;

        if let Some(entry) = self.db.get_active_user(session_id)? {
            return Ok(registration(entry, false));
        }

        for attempt in 1..=self.max_name_attempts {
            let candidate = guest_name(self.suffixes.draw());

            match self.db.claim_session(session_id, &candidate, self.clock.now()) {
                Ok(ClaimOutcome::Created(entry)) => {
                    info!("Registered session as {} after {} draw(s)", entry.display_name, attempt);
                    return Ok(registration(entry, true));
                }
                Ok(ClaimOutcome::Existing(entry)) => return Ok(registration(entry, false)),
                Ok(ClaimOutcome::NameTaken) => {
                    debug!("Guest name {} taken (attempt {})", candidate, attempt);
                }
                Err(e) if e.is_conflict() => {
                    // Another writer got in first. If it created our session, use
                    // that entry; otherwise it took the name, so draw again.
                    if let Some(entry) = self.db.get_active_user(session_id)? {
                        return Ok(registration(entry, false));
                    }
                    debug!("Write conflict on guest name {} (attempt {}): {}", candidate, attempt, e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            "Gave up allocating a guest name after {} attempts",
            self.max_name_attempts
        );
        Err(ChatError::ResourceExhausted {
            attempts: self.max_name_attempts,
        })
    }

    /// Refreshes the session, overwriting its display name. A session that
    /// is unknown (never registered, or already reaped) is recreated.
    pub fn heartbeat(&self, session_id: &str, display_name: &str) -> Result<HeartbeatStatus, ChatError> {
        require_text("session_id", session_id, MAX_SESSION_ID_CHARS)?;
        require_text("username", display_name, MAX_DISPLAY_NAME_CHARS)?;

        let status = self
            .db
            .upsert_active_user(session_id, display_name, self.clock.now())?;
        if status == HeartbeatStatus::Created {
            debug!("Heartbeat recreated presence for {}", display_name);
        }
        Ok(status)
    }

    /// Number of online entries. Expired entries are excluded whether or not
    /// they have been reaped yet.
    pub fn online_count(&self) -> Result<u64, ChatError> {
        Ok(self.db.count_active_since(self.cutoff())?)
    }

    /// Deletes every entry that is no longer online and returns how many
    /// were removed.
    pub fn reap(&self) -> Result<usize, ChatError> {
        Ok(self.db.delete_inactive_until(self.cutoff())?)
    }

    pub fn entry(&self, session_id: &str) -> Result<Option<PresenceEntry>, ChatError> {
        Ok(self.db.get_active_user(session_id)?)
    }

    fn cutoff(&self) -> DateTime<Utc> {
        self.clock.now() - liveness_window()
    }
}

pub fn liveness_window() -> Duration {
    Duration::seconds(LIVENESS_WINDOW_SECS)
}

fn registration(entry: PresenceEntry, created: bool) -> Registration {
    Registration {
        session_id: entry.session_id,
        display_name: entry.display_name,
        created,
    }
}
