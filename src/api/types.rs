//! Reference data returned by the API and the wire shapes it is parsed from.

use chrono::{DateTime, Utc};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

/// A target voice offered by the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// CreditsInfo
// ---------------------------------------------------------------------------

/// Snapshot of the account's character quota.
///
/// `characters_remaining` is derived from the other two counters when the
/// snapshot is built and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditsInfo {
    characters_used: u64,
    characters_limit: u64,
    characters_remaining: u64,
    tier: String,
    reset_at: Option<DateTime<Utc>>,
}

impl CreditsInfo {
    pub fn new(
        characters_used: u64,
        characters_limit: u64,
        tier: impl Into<String>,
        reset_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            characters_used,
            characters_limit,
            characters_remaining: characters_limit.saturating_sub(characters_used),
            tier: tier.into(),
            reset_at,
        }
    }

    pub fn characters_used(&self) -> u64 {
        self.characters_used
    }

    pub fn characters_limit(&self) -> u64 {
        self.characters_limit
    }

    pub fn characters_remaining(&self) -> u64 {
        self.characters_remaining
    }

    pub fn tier(&self) -> &str {
        &self.tier
    }

    /// When the quota next resets, if the service reported it.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.reset_at
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// `GET /v1/voices`
#[derive(Debug, Deserialize)]
pub(crate) struct VoicesResponse {
    #[serde(default)]
    pub voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VoiceEntry {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<VoiceEntry> for Voice {
    fn from(entry: VoiceEntry) -> Self {
        let description = entry
            .description
            .filter(|d| !d.trim().is_empty())
            .or(entry.category)
            .unwrap_or_default();
        Voice {
            id: entry.voice_id,
            name: entry.name,
            description,
        }
    }
}

/// `GET /v1/user/subscription`
#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionResponse {
    pub character_count: u64,
    pub character_limit: u64,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub next_character_count_reset_unix: Option<i64>,
}

impl From<SubscriptionResponse> for CreditsInfo {
    fn from(sub: SubscriptionResponse) -> Self {
        let reset_at = sub
            .next_character_count_reset_unix
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        CreditsInfo::new(sub.character_count, sub.character_limit, sub.tier, reset_at)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
