use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder stored when a notification arrives without a subject.
pub const NO_SUBJECT: &str = "(no subject)";

/// Shortest url a notification may carry.
pub const MIN_URL_LENGTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordValidationError {
    #[error("Notification id must not be negative, got {0}")]
    NegativeId(i64),
    #[error("Entry id must not be negative, got {0}")]
    NegativeEntryId(i64),
    #[error("Url must be at least {MIN_URL_LENGTH} characters long")]
    UrlTooShort,
}

/// Shape of an inbound notification, decided by which payload fields were sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Trackback,
    Postit,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Trackback => "trackback",
            NotificationType::Postit => "postit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trackback" => Some(NotificationType::Trackback),
            "postit" => Some(NotificationType::Postit),
            _ => None,
        }
    }
}

/// A validated notification that has not been persisted yet.
///
/// All free-text fields are normalized on the way in: a blank subject
/// becomes [`NO_SUBJECT`], missing text becomes an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    entry_id: i64,
    url: String,
    subject: String,
    body: String,
    author_email: String,
    author_name: String,
    blog_name: String,
    notification_type: NotificationType,
}

impl NewNotification {
    pub fn new(entry_id: i64, url: impl Into<String>) -> Result<Self, RecordValidationError> {
        if entry_id < 0 {
            return Err(RecordValidationError::NegativeEntryId(entry_id));
        }
        let url = url.into();
        if url.chars().count() < MIN_URL_LENGTH {
            return Err(RecordValidationError::UrlTooShort);
        }
        Ok(Self {
            entry_id,
            url,
            subject: NO_SUBJECT.to_string(),
            body: String::new(),
            author_email: String::new(),
            author_name: String::new(),
            blog_name: String::new(),
            notification_type: NotificationType::Trackback,
        })
    }

    pub fn with_subject(mut self, subject: Option<&str>) -> Self {
        self.subject = match subject {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => NO_SUBJECT.to_string(),
        };
        self
    }

    pub fn with_body(mut self, body: Option<&str>) -> Self {
        self.body = body.unwrap_or_default().to_string();
        self
    }

    pub fn with_author_email(mut self, email: Option<&str>) -> Self {
        self.author_email = email.unwrap_or_default().to_string();
        self
    }

    pub fn with_author_name(mut self, name: Option<&str>) -> Self {
        self.author_name = name.unwrap_or_default().to_string();
        self
    }

    pub fn with_blog_name(mut self, blog_name: Option<&str>) -> Self {
        self.blog_name = blog_name.unwrap_or_default().to_string();
        self
    }

    pub fn with_type(mut self, notification_type: NotificationType) -> Self {
        self.notification_type = notification_type;
        self
    }

    pub fn entry_id(&self) -> i64 {
        self.entry_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn author_email(&self) -> &str {
        &self.author_email
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn blog_name(&self) -> &str {
        &self.blog_name
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    /// Attaches the server-assigned id and timestamp.
    pub fn into_record(
        self,
        id: i64,
        date: DateTime<Utc>,
    ) -> Result<NotificationRecord, RecordValidationError> {
        if id < 0 {
            return Err(RecordValidationError::NegativeId(id));
        }
        Ok(NotificationRecord {
            id,
            entry_id: self.entry_id,
            date,
            subject: self.subject,
            body: self.body,
            author_email: self.author_email,
            author_name: self.author_name,
            blog_name: self.blog_name,
            url: self.url,
            notification_type: self.notification_type,
        })
    }
}

/// A stored notification. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub entry_id: i64,
    pub date: DateTime<Utc>,
    pub subject: String,
    pub body: String,
    pub author_email: String,
    pub author_name: String,
    pub blog_name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
}

/// Result of asking the store to persist a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(NotificationRecord),
    /// A record for the same (entry_id, url) already exists; nothing was written.
    Duplicate,
}
