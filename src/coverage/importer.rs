//! Turning a wrangler response feed into per-identifier outcomes.
//!
//! One interpreter serves every operation; what differs between them is only
//! which `simplified:message` status codes count as success.

use std::collections::HashMap;

use super::opds::{FeedMessage, ParsedFeed};

/// What happened to one identifier in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    Failure { transient: bool, message: String },
}

impl ItemOutcome {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Failure {
            transient: true,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Whether a failing status code is worth retrying.
///
/// Client errors will fail the same way next time, except for request
/// timeouts and rate limiting.
pub fn is_transient_status(status_code: u16) -> bool {
    !(400..500).contains(&status_code) || status_code == 408 || status_code == 429
}

/// Interpret one status message.
pub fn interpret_message(message: &FeedMessage, success_codes: &[u16]) -> ItemOutcome {
    if success_codes.contains(&message.status_code) {
        return ItemOutcome::Success;
    }
    let detail = if message.message.is_empty() {
        format!("Status code {}", message.status_code)
    } else {
        format!("{}: {}", message.status_code, message.message)
    };
    ItemOutcome::Failure {
        transient: is_transient_status(message.status_code),
        message: detail,
    }
}

/// Outcomes keyed by URN for everything the feed reports on.
///
/// Entries with bibliographic data are successes. When both an entry and a
/// message mention the same URN, the entry wins.
pub fn interpret_feed(feed: &ParsedFeed, success_codes: &[u16]) -> HashMap<String, ItemOutcome> {
    let mut outcomes = HashMap::new();

    for message in &feed.messages {
        if let Some(urn) = &message.urn {
            outcomes.insert(urn.clone(), interpret_message(message, success_codes));
        }
    }

    for entry in &feed.entries {
        let outcome = if entry.title.is_some() {
            ItemOutcome::Success
        } else {
            ItemOutcome::transient("Entry had no bibliographic data")
        };
        if outcome.is_success() || !outcomes.contains_key(&entry.urn) {
            outcomes.insert(entry.urn.clone(), outcome);
        }
    }

    outcomes
}
