use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::notify::Channel;

/// Longest accepted duration; timers are armed in milliseconds.
pub const MAX_DURATION_SECS: u64 = u64::MAX / 1000;

/// Stable identity of a reminder, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(Uuid);

impl ReminderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReminderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ReminderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Which channels a reminder fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSet {
    pub console: bool,
    pub visual: bool,
    pub audio: bool,
}

impl ChannelSet {
    pub fn all() -> Self {
        Self {
            console: true,
            visual: true,
            audio: true,
        }
    }

    pub fn none() -> Self {
        Self {
            console: false,
            visual: false,
            audio: false,
        }
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Console => self.console,
            Channel::Visual => self.visual,
            Channel::Audio => self.audio,
        }
    }

    pub fn set(&mut self, channel: Channel, enabled: bool) {
        match channel {
            Channel::Console => self.console = enabled,
            Channel::Visual => self.visual = enabled,
            Channel::Audio => self.audio = enabled,
        }
    }

    pub fn enabled(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Values a freshly created reminder starts with.
///
/// Stored in the `[defaults]` section of `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDefaults {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default = "default_cycle_duration")]
    pub cycle_duration_secs: u64,
    #[serde(default = "default_true")]
    pub console: bool,
    #[serde(default = "default_true")]
    pub visual: bool,
    #[serde(default = "default_true")]
    pub audio: bool,
    #[serde(default)]
    pub wait_for_acknowledgement: bool,
    #[serde(default = "default_true")]
    pub auto_acknowledge: bool,
    #[serde(default = "default_auto_acknowledge_delay")]
    pub auto_acknowledge_delay_secs: u64,
}

fn default_name() -> String {
    "Reminder".into()
}
fn default_message() -> String {
    "Message Here!".into()
}
fn default_cycle_duration() -> u64 {
    5
}
fn default_auto_acknowledge_delay() -> u64 {
    3
}
fn default_true() -> bool {
    true
}

impl Default for ReminderDefaults {
    fn default() -> Self {
        Self {
            name: default_name(),
            message: default_message(),
            cycle_duration_secs: default_cycle_duration(),
            console: true,
            visual: true,
            audio: true,
            wait_for_acknowledgement: false,
            auto_acknowledge: true,
            auto_acknowledge_delay_secs: default_auto_acknowledge_delay(),
        }
    }
}

/// Persisted, user-mutable part of a reminder.
///
/// This is the snapshot handed to the persistence service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderConfig {
    pub id: ReminderId,
    pub name: String,
    pub message: String,
    pub cycle_duration_secs: u64,
    pub channels: ChannelSet,
    pub wait_for_acknowledgement: bool,
    pub auto_acknowledge: bool,
    pub auto_acknowledge_delay_secs: u64,
}

impl ReminderConfig {
    pub fn from_defaults(defaults: &ReminderDefaults) -> Self {
        Self {
            id: ReminderId::new(),
            name: defaults.name.clone(),
            message: defaults.message.clone(),
            cycle_duration_secs: defaults.cycle_duration_secs.clamp(1, MAX_DURATION_SECS),
            channels: ChannelSet {
                console: defaults.console,
                visual: defaults.visual,
                audio: defaults.audio,
            },
            wait_for_acknowledgement: defaults.wait_for_acknowledgement,
            auto_acknowledge: defaults.auto_acknowledge,
            auto_acknowledge_delay_secs: defaults
                .auto_acknowledge_delay_secs
                .clamp(1, MAX_DURATION_SECS),
        }
    }

    /// "every 5 seconds", "every 1 second".
    pub fn describe_repeat(&self) -> String {
        let n = self.cycle_duration_secs;
        format!("every {n} second{}", if n == 1 { "" } else { "s" })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text("name", &self.name)?;
        check_text("message", &self.message)?;
        check_duration("cycle_duration_secs", self.cycle_duration_secs)?;
        check_duration("auto_acknowledge_delay_secs", self.auto_acknowledge_delay_secs)
    }

    fn apply(&mut self, patch: &ReminderPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(message) = &patch.message {
            self.message = message.clone();
        }
        if let Some(secs) = patch.cycle_duration_secs {
            self.cycle_duration_secs = secs;
        }
        if let Some(on) = patch.console {
            self.channels.console = on;
        }
        if let Some(on) = patch.visual {
            self.channels.visual = on;
        }
        if let Some(on) = patch.audio {
            self.channels.audio = on;
        }
        if let Some(wait) = patch.wait_for_acknowledgement {
            self.wait_for_acknowledgement = wait;
        }
        if let Some(auto) = patch.auto_acknowledge {
            self.auto_acknowledge = auto;
        }
        if let Some(secs) = patch.auto_acknowledge_delay_secs {
            self.auto_acknowledge_delay_secs = secs;
        }
    }

    /// Apply `patch` if the result is valid; leave `self` untouched otherwise.
    pub fn patched(&self, patch: &ReminderPatch) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        next.apply(patch);
        next.validate()?;
        Ok(next)
    }
}

fn check_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

fn check_duration(field: &'static str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NotPositive(field));
    }
    if value > MAX_DURATION_SECS {
        return Err(ValidationError::TooLarge {
            field,
            max: MAX_DURATION_SECS,
        });
    }
    Ok(())
}

/// A batch of configuration changes, applied and persisted together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_duration_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_acknowledgement: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_acknowledge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_acknowledge_delay_secs: Option<u64>,
}

impl ReminderPatch {
    pub fn channel(channel: Channel, enabled: bool) -> Self {
        let mut patch = Self::default();
        match channel {
            Channel::Console => patch.console = Some(enabled),
            Channel::Visual => patch.visual = Some(enabled),
            Channel::Audio => patch.audio = Some(enabled),
        }
        patch
    }

    /// Build a single-field patch from a `key`/`value` pair as typed on the
    /// command line.
    pub fn from_key_value(key: &str, value: &str) -> Result<Self, ValidationError> {
        let mut patch = Self::default();
        let parse_bool = |v: &str| {
            v.parse::<bool>().map_err(|_| ValidationError::Unparsable {
                value: v.to_string(),
                expected: "bool",
            })
        };
        let parse_secs = |v: &str| {
            v.parse::<u64>().map_err(|_| ValidationError::Unparsable {
                value: v.to_string(),
                expected: "seconds",
            })
        };
        match key {
            "name" => patch.name = Some(value.to_string()),
            "message" => patch.message = Some(value.to_string()),
            "cycle_duration_secs" | "every" => patch.cycle_duration_secs = Some(parse_secs(value)?),
            "console" => patch.console = Some(parse_bool(value)?),
            "visual" => patch.visual = Some(parse_bool(value)?),
            "audio" => patch.audio = Some(parse_bool(value)?),
            "wait_for_acknowledgement" | "wait" => {
                patch.wait_for_acknowledgement = Some(parse_bool(value)?)
            }
            "auto_acknowledge" => patch.auto_acknowledge = Some(parse_bool(value)?),
            "auto_acknowledge_delay_secs" | "auto_ack_delay" => {
                patch.auto_acknowledge_delay_secs = Some(parse_secs(value)?)
            }
            _ => return Err(ValidationError::UnknownField(key.to_string())),
        }
        Ok(patch)
    }
}
