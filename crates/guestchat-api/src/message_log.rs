use std::sync::Arc;

use tracing::debug;

use guestchat_db::Database;
use guestchat_types::models::ChatMessage;

use crate::clock::{Clock, SystemClock};
use crate::error::{ChatError, require_text};

pub const MAX_BODY_CHARS: usize = 1000;
pub const MAX_AUTHOR_CHARS: usize = 50;

/// Append-only chat history.
#[derive(Clone)]
pub struct MessageLog {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl MessageLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Stores a message. The author is taken as given; it is not checked
    /// against registered sessions.
    pub fn append(&self, author: &str, body: &str) -> Result<ChatMessage, ChatError> {
        require_text("username", author, MAX_AUTHOR_CHARS)?;
        if body.chars().count() > MAX_BODY_CHARS {
            return Err(ChatError::validation(
                "message_text",
                format!("Message text cannot exceed {MAX_BODY_CHARS} characters."),
            ));
        }
        if body.trim().is_empty() {
            return Err(ChatError::validation("message_text", "Message text cannot be empty."));
        }

        let message = self.db.insert_message(author, body, self.clock.now())?;
        debug!("Message {} appended by {}", message.id, message.author);
        Ok(message)
    }

    /// Every message, oldest first.
    pub fn list_all(&self) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.db.list_messages()?)
    }
}
