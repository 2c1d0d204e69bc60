//! Per-community state and gates: the enabled/disabled-channel toggle, the
//! caller identity used for removal authorization, and the bounded
//! yes-confirmation required before destructive bulk operations.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub type GuildId = u64;
pub type ChannelId = u64;
pub type UserId = u64;

/// How long a destructive operation waits for its confirmation reply.
pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(8);

/// Per-community settings. Previews are on by default; individual channels
/// can be opted out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    pub enabled: bool,
    pub disabled_channels: Vec<ChannelId>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_channels: Vec::new(),
        }
    }
}

impl GuildSettings {
    /// Whether messages in the given channel should be scanned for links.
    pub fn should_process(&self, channel: ChannelId) -> bool {
        self.enabled && !self.disabled_channels.contains(&channel)
    }

    /// Flip the community-wide toggle; returns the new state.
    pub fn toggle_server(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Flip the per-channel opt-out; returns true if the channel is now
    /// enabled, false if it is now disabled.
    pub fn toggle_channel(&mut self, channel: ChannelId) -> bool {
        if let Some(pos) = self.disabled_channels.iter().position(|c| *c == channel) {
            self.disabled_channels.remove(pos);
            true
        } else {
            self.disabled_channels.push(channel);
            false
        }
    }
}

/// Identity of the user invoking a collection command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    /// Holds the community's privileged role.
    pub is_privileged: bool,
    pub is_admin: bool,
}

impl Caller {
    /// Removal is allowed for the original submitter, a privileged role, or
    /// an administrator.
    pub fn can_remove(&self, submitter: UserId) -> bool {
        self.user_id == submitter || self.is_privileged || self.is_admin
    }
}

/// A pending confirmation for a destructive bulk operation. The requester
/// must answer "yes" within the timeout; anything else (or anyone else, or
/// too late) leaves the state untouched.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmPrompt {
    requester: UserId,
    deadline: Instant,
}

impl ConfirmPrompt {
    pub fn new(requester: UserId, now: Instant) -> Self {
        Self {
            requester,
            deadline: now + CONFIRM_TIMEOUT,
        }
    }

    /// True only for the original requester replying an affirmative "yes"
    /// (case-insensitive) before the deadline.
    pub fn accepts(&self, author: UserId, content: &str, now: Instant) -> bool {
        author == self.requester && now <= self.deadline && content.trim().eq_ignore_ascii_case("yes")
    }

    pub fn expired(&self, now: Instant) -> bool {
        now > self.deadline
    }
}
