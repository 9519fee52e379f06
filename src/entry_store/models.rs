use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who may see an entry. Only public entries accept or send notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    Private,
    Friends,
    Public,
}

impl Security {
    pub fn as_str(&self) -> &'static str {
        match self {
            Security::Private => "private",
            Security::Friends => "friends",
            Security::Public => "public",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "private" => Some(Security::Private),
            "friends" => Some(Security::Friends),
            "public" => Some(Security::Public),
            _ => None,
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Security::Public)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub username: String,
    pub blog_name: String,
    pub subject: String,
    pub body: String,
    pub security: Security,
    /// Page the author explicitly wants to notify.
    pub trackback_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub id: i64,
    pub username: String,
    pub blog_name: String,
    pub subject: String,
    pub body: String,
    pub security: Security,
    pub trackback_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
