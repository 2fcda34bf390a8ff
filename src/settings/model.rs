//! User settings model: known fields plus a pass-through bag for anything
//! else found in (or written to) the settings file.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which group list the wizard writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupListMode {
    /// Only listed groups are evaluated.
    Inclusion,
    /// Every group except the listed ones is evaluated.
    Exclusion,
}

impl std::fmt::Display for GroupListMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Inclusion => "inclusion",
            Self::Exclusion => "exclusion",
        };
        write!(f, "{s}")
    }
}

/// The settings keys with dedicated handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Interests,
    CommandChatId,
    NotificationChatId,
    ProcessDirectMessages,
    GroupInclusionList,
    GroupExclusionList,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::Interests,
        SettingKey::CommandChatId,
        SettingKey::NotificationChatId,
        SettingKey::ProcessDirectMessages,
        SettingKey::GroupInclusionList,
        SettingKey::GroupExclusionList,
    ];

    /// Case-insensitive lookup of a user-typed key.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(key.trim()))
    }

    /// Field name as stored in the settings file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interests => "interests",
            Self::CommandChatId => "commandChatId",
            Self::NotificationChatId => "notificationChatId",
            Self::ProcessDirectMessages => "processDirectMessages",
            Self::GroupInclusionList => "groupInclusionList",
            Self::GroupExclusionList => "groupExclusionList",
        }
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted configuration object.
///
/// Invariant: `group_inclusion_list` and `group_exclusion_list` are never both
/// non-empty. Writers go through [`UserSettings::set_group_filter`];
/// [`UserSettings::normalize`] repairs hand-edited files.
///
/// Loading is lenient: see the `From<Map<String, Value>>` impl.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct UserSettings {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_direct_messages: Option<bool>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub group_inclusion_list: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub group_exclusion_list: BTreeSet<String>,
    /// Unrecognized keys, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Build settings from a raw JSON object.
///
/// Known keys match case-insensitively. `interests` also accepts a
/// comma-separated string and `processDirectMessages` accepts `on`/`off`/
/// `true`/`false` strings. A known key holding anything else is kept in
/// `extra` under its original name.
impl From<Map<String, Value>> for UserSettings {
    fn from(map: Map<String, Value>) -> Self {
        let mut settings = UserSettings::default();
        for (name, value) in map {
            let rejected = match SettingKey::parse(&name) {
                Some(key) => settings.absorb(key, value).err(),
                None => Some(value),
            };
            if let Some(value) = rejected {
                settings.extra.insert(name, value);
            }
        }
        settings
    }
}

fn string_list(value: Value) -> Result<Vec<String>, Value> {
    let items = match value {
        Value::Array(items) => items,
        other => return Err(other),
    };
    if !items.iter().all(Value::is_string) {
        return Err(Value::Array(items));
    }
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

fn switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" => Some(true),
        "off" | "false" => Some(false),
        _ => None,
    }
}

impl UserSettings {
    /// Direct messages are processed unless explicitly turned off.
    pub fn process_direct_messages(&self) -> bool {
        self.process_direct_messages != Some(false)
    }

    /// Command chat, defaulting to the bot's own identity chat.
    pub fn command_chat_or<'a>(&'a self, own_chat: &'a str) -> &'a str {
        self.command_chat_id.as_deref().unwrap_or(own_chat)
    }

    /// Notification chat, defaulting to the bot's own identity chat.
    pub fn notification_chat_or<'a>(&'a self, own_chat: &'a str) -> &'a str {
        self.notification_chat_id.as_deref().unwrap_or(own_chat)
    }

    /// Replace the interests from a comma-separated list.
    pub fn set_interests_from_csv(&mut self, csv: &str) {
        self.interests = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// Write one group list and clear the other.
    pub fn set_group_filter(&mut self, mode: GroupListMode, ids: BTreeSet<String>) {
        match mode {
            GroupListMode::Inclusion => {
                self.group_inclusion_list = ids;
                self.group_exclusion_list.clear();
            }
            GroupListMode::Exclusion => {
                self.group_exclusion_list = ids;
                self.group_inclusion_list.clear();
            }
        }
    }

    /// Restore the list invariant. Inclusion wins since it is the stricter
    /// filter. Returns `true` if anything changed.
    ///
    /// Also drops `extra` entries shadowed by a known field that now holds a
    /// value, so a saved file never carries the same key twice.
    pub fn normalize(&mut self) -> bool {
        let set: Vec<SettingKey> = SettingKey::ALL
            .into_iter()
            .filter(|k| self.is_set(*k))
            .collect();
        self.extra
            .retain(|name, _| SettingKey::parse(name).is_none_or(|k| !set.contains(&k)));

        if !self.group_inclusion_list.is_empty() && !self.group_exclusion_list.is_empty() {
            self.group_exclusion_list.clear();
            return true;
        }
        false
    }

    /// Store a raw JSON value in a known field, handing it back if its type
    /// does not fit.
    fn absorb(&mut self, key: SettingKey, value: Value) -> Result<(), Value> {
        if value.is_null() {
            return Ok(());
        }
        match key {
            SettingKey::Interests => match value {
                Value::String(csv) => self.set_interests_from_csv(&csv),
                other => self.interests = string_list(other)?,
            },
            SettingKey::CommandChatId | SettingKey::NotificationChatId => {
                let id = match value {
                    Value::String(id) => id,
                    other => return Err(other),
                };
                if key == SettingKey::CommandChatId {
                    self.command_chat_id = Some(id);
                } else {
                    self.notification_chat_id = Some(id);
                }
            }
            SettingKey::ProcessDirectMessages => {
                let enabled = match &value {
                    Value::Bool(b) => Some(*b),
                    Value::String(s) => switch(s),
                    _ => None,
                };
                self.process_direct_messages = Some(enabled.ok_or(value)?);
            }
            SettingKey::GroupInclusionList => {
                self.group_inclusion_list = string_list(value)?.into_iter().collect();
            }
            SettingKey::GroupExclusionList => {
                self.group_exclusion_list = string_list(value)?.into_iter().collect();
            }
        }
        Ok(())
    }

    /// Plain string assignment for `!set key=value`.
    ///
    /// Chat id keys land in their typed fields; anything else goes to the
    /// extra bag, replacing an existing entry that differs only in case.
    pub fn assign_string(&mut self, key: &str, value: String) {
        match SettingKey::parse(key) {
            Some(SettingKey::CommandChatId) => self.command_chat_id = Some(value),
            Some(SettingKey::NotificationChatId) => self.notification_chat_id = Some(value),
            _ => {
                let stored_key = self
                    .extra
                    .keys()
                    .find(|k| k.eq_ignore_ascii_case(key))
                    .cloned()
                    .unwrap_or_else(|| key.to_string());
                self.extra.insert(stored_key, Value::String(value));
            }
        }
    }

    /// Case-insensitive lookup in the extra bag.
    pub fn extra_entry(&self, key: &str) -> Option<(&String, &Value)> {
        self.extra.iter().find(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Whether a known key currently holds a value.
    pub fn is_set(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::Interests => !self.interests.is_empty(),
            SettingKey::CommandChatId => self.command_chat_id.is_some(),
            SettingKey::NotificationChatId => self.notification_chat_id.is_some(),
            SettingKey::ProcessDirectMessages => self.process_direct_messages.is_some(),
            SettingKey::GroupInclusionList => !self.group_inclusion_list.is_empty(),
            SettingKey::GroupExclusionList => !self.group_exclusion_list.is_empty(),
        }
    }
}
