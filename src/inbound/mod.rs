//! Receiving trackback and post-it pings from other sites.
//!
//! [`InboundPingReceiver::receive`] is a linear pipeline. Each step can
//! short-circuit with a [`PingError`]:
//!
//! 1. abuse check (escalates an existing block)
//! 2. entry id present
//! 3. url present and its domain resolves
//! 4. entry exists and is public
//! 5. payload shaping (trackback vs post-it)
//! 6. optional author email, kept only if valid and resolvable
//! 7. persist, rejecting duplicates
//!
//! Every rejection after step 1 puts the caller's IP on the base block.
//! A form that cannot be read at all goes through
//! [`InboundPingReceiver::reject_unreadable`], which runs step 1 the same way.

mod error;
mod response;

pub use error::PingError;
pub use response::{generate_response, XmlResponse, XML_CONTENT_TYPE};

use crate::abuse::{AbuseThrottle, ThrottlePolicy};
use crate::domain_validator::{is_email_valid, DomainValidator};
use crate::entry_store::EntryStore;
use crate::server::metrics::{record_inbound_ping, record_throttle_block};
use crate::trackback_store::{
    NewNotification, NotificationRecord, NotificationType, SaveOutcome, TrackbackStore,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const UNREADABLE_FORM_MESSAGE: &str = "Unreadable ping form.";
const INTERNAL_ERROR_MESSAGE: &str = "Internal error.";

/// Form fields of an inbound ping. Everything is optional at this level.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PingRequest {
    #[serde(rename = "entryID")]
    pub entry_id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub email: Option<String>,
    pub blog_name: Option<String>,
}

pub struct InboundPingReceiver {
    entries: Arc<dyn EntryStore>,
    trackbacks: Arc<dyn TrackbackStore>,
    throttle: Arc<dyn AbuseThrottle>,
    validator: DomainValidator,
    policy: ThrottlePolicy,
}

impl InboundPingReceiver {
    pub fn new(
        entries: Arc<dyn EntryStore>,
        trackbacks: Arc<dyn TrackbackStore>,
        throttle: Arc<dyn AbuseThrottle>,
        validator: DomainValidator,
        policy: ThrottlePolicy,
    ) -> Self {
        Self {
            entries,
            trackbacks,
            throttle,
            validator,
            policy,
        }
    }

    /// Runs the whole pipeline for one ping from `ip`.
    ///
    /// `query_entry_id` is the id from the path or query string; when it is
    /// absent or not positive the form's `entryID` is used instead.
    pub async fn receive(
        &self,
        ip: &str,
        query_entry_id: Option<&str>,
        request: &PingRequest,
    ) -> Result<NotificationRecord, PingError> {
        self.check_abuse(ip)?;

        let result = self.process(query_entry_id, request).await;
        self.record_outcome(ip, &result);
        result
    }

    /// Turns down a ping whose form could not be read. The abuse check
    /// still runs first, so a blocked caller gets the escalated block.
    pub fn reject_unreadable(&self, ip: &str) -> PingError {
        if let Err(err) = self.check_abuse(ip) {
            return err;
        }
        let err = PingError::InvalidParameter(UNREADABLE_FORM_MESSAGE.to_string());
        self.record_rejection(ip, &err);
        err
    }

    fn check_abuse(&self, ip: &str) -> Result<(), PingError> {
        if self.throttle.extend_if_blocked(ip, self.policy.escalated_block) {
            warn!(
                "Multiple trackback requests during timeout period from {}, blocking for {:?}",
                ip, self.policy.escalated_block
            );
            record_throttle_block("escalated");
            record_inbound_ping(PingError::AbuseBlocked.outcome());
            return Err(PingError::AbuseBlocked);
        }
        Ok(())
    }

    fn record_outcome(&self, ip: &str, result: &Result<NotificationRecord, PingError>) {
        match result {
            Ok(record) => {
                info!(
                    "Accepted {} for entry {} from {}",
                    record.notification_type.as_str(),
                    record.entry_id,
                    record.url
                );
                record_inbound_ping("accepted");
            }
            Err(err) => self.record_rejection(ip, err),
        }
    }

    fn record_rejection(&self, ip: &str, err: &PingError) {
        if err.applies_base_block() {
            debug!("Rejected ping from {}: {}", ip, err);
            self.throttle.block(ip, self.policy.base_block);
            record_throttle_block("base");
        }
        record_inbound_ping(err.outcome());
    }

    async fn process(
        &self,
        query_entry_id: Option<&str>,
        request: &PingRequest,
    ) -> Result<NotificationRecord, PingError> {
        let entry_id = parse_entry_id(query_entry_id)
            .or_else(|| parse_entry_id(request.entry_id.as_deref()))
            .ok_or(PingError::MissingParameter("entryID"))?;

        let url = non_blank(request.url.as_deref()).ok_or(PingError::MissingParameter("url"))?;
        if !self.validator.is_url_domain_valid(url).await {
            return Err(PingError::MissingParameter("url"));
        }

        let entry = self
            .entries
            .get_entry(entry_id)
            .map_err(|e| internal("Entry lookup failed", e))?
            .ok_or(PingError::NotFound)?;
        if !entry.security.is_public() {
            return Err(PingError::Forbidden);
        }

        let (subject, body, notification_type) = shape_payload(request);

        let mut email = None;
        if let Some(candidate) = non_blank(request.email.as_deref()) {
            if is_email_valid(candidate) && self.validator.is_email_domain_valid(candidate).await {
                email = Some(candidate);
            }
        }

        let notification = NewNotification::new(entry_id, url)
            .map_err(|e| PingError::InvalidParameter(e.to_string()))?
            .with_subject(subject)
            .with_body(body)
            .with_author_email(email)
            .with_blog_name(request.blog_name.as_deref())
            .with_type(notification_type);

        match self
            .trackbacks
            .save(&notification)
            .map_err(|e| internal("Saving trackback failed", e))?
        {
            SaveOutcome::Created(record) => Ok(record),
            SaveOutcome::Duplicate => Err(PingError::Duplicate),
        }
    }
}

fn internal(context: &str, err: anyhow::Error) -> PingError {
    error!("{}: {:#}", context, err);
    PingError::Internal(INTERNAL_ERROR_MESSAGE.to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_entry_id(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
}

/// Picks subject, body and type from the payload.
///
/// Trackback fields win when present, post-it fields fill the gaps. Using
/// either post-it field turns the whole ping into a post-it, even when the
/// other half came from trackback fields.
fn shape_payload(request: &PingRequest) -> (Option<&str>, Option<&str>, NotificationType) {
    let mut notification_type = NotificationType::Trackback;

    let subject = match (non_blank(request.title.as_deref()), non_blank(request.name.as_deref())) {
        (Some(title), _) => Some(title),
        (None, Some(name)) => {
            notification_type = NotificationType::Postit;
            Some(name)
        }
        (None, None) => None,
    };

    let body = match (
        non_blank(request.excerpt.as_deref()),
        non_blank(request.comment.as_deref()),
    ) {
        (Some(excerpt), _) => Some(excerpt),
        (None, Some(comment)) => {
            notification_type = NotificationType::Postit;
            Some(comment)
        }
        (None, None) => None,
    };

    (subject, body, notification_type)
}
