//! Filtering policy: decides which inbound messages are worth a relevance
//! check, based on the group lists and the direct-message switch.
//!
//! Pure: no I/O, no logging, same answer for the same inputs.

use crate::pipeline::types::IncomingMessage;
use crate::settings::UserSettings;

/// Outcome of the policy check, with the reason for a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Accepted,
    /// Group not in the non-empty inclusion list.
    NotIncluded,
    /// Group in the exclusion list.
    Excluded,
    /// Direct messages are switched off.
    DirectMessagesOff,
}

impl FilterVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::NotIncluded => "not_included",
            Self::Excluded => "excluded",
            Self::DirectMessagesOff => "direct_messages_off",
        }
    }
}

/// Evaluate the policy for one message.
pub fn evaluate(message: &IncomingMessage, settings: &UserSettings) -> FilterVerdict {
    if message.is_group {
        let chat_id = message.actual_chat_id();
        if !settings.group_inclusion_list.is_empty() {
            if settings.group_inclusion_list.contains(chat_id) {
                FilterVerdict::Accepted
            } else {
                FilterVerdict::NotIncluded
            }
        } else if settings.group_exclusion_list.contains(chat_id) {
            FilterVerdict::Excluded
        } else {
            FilterVerdict::Accepted
        }
    } else if settings.process_direct_messages() {
        FilterVerdict::Accepted
    } else {
        FilterVerdict::DirectMessagesOff
    }
}

/// Whether the message should go on to relevance analysis.
pub fn accept(message: &IncomingMessage, settings: &UserSettings) -> bool {
    evaluate(message, settings).is_accepted()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::settings::GroupListMode;

    fn with_groups(mode: GroupListMode, ids: &[&str]) -> UserSettings {
        let mut settings = UserSettings::default();
        settings.set_group_filter(mode, ids.iter().map(|s| s.to_string()).collect());
        settings
    }

    #[test]
    fn direct_message_accepted_when_switch_unset() {
        let msg = IncomingMessage::direct("alice@c.us", "hello");
        assert!(accept(&msg, &UserSettings::default()));
    }

    #[test]
    fn direct_message_rejected_when_switched_off() {
        let msg = IncomingMessage::direct("alice@c.us", "hello");
        let settings = UserSettings {
            process_direct_messages: Some(false),
            ..Default::default()
        };
        assert_eq!(evaluate(&msg, &settings), FilterVerdict::DirectMessagesOff);

        let settings = UserSettings {
            process_direct_messages: Some(true),
            ..Default::default()
        };
        assert!(accept(&msg, &settings));
    }

    #[test]
    fn group_accepted_without_lists() {
        let msg = IncomingMessage::group("G1", "bob@c.us", "hi");
        assert!(accept(&msg, &UserSettings::default()));
    }

    #[test]
    fn inclusion_list_gates_groups() {
        let settings = with_groups(GroupListMode::Inclusion, &["G1"]);
        assert!(accept(&IncomingMessage::group("G1", "bob", "hi"), &settings));
        assert_eq!(
            evaluate(&IncomingMessage::group("G2", "bob", "hi"), &settings),
            FilterVerdict::NotIncluded
        );
    }

    #[test]
    fn exclusion_list_blocks_listed_groups() {
        let settings = with_groups(GroupListMode::Exclusion, &["G1"]);
        assert_eq!(
            evaluate(&IncomingMessage::group("G1", "bob", "hi"), &settings),
            FilterVerdict::Excluded
        );
        assert!(accept(&IncomingMessage::group("G2", "bob", "hi"), &settings));
    }

    #[test]
    fn group_lists_do_not_affect_direct_messages() {
        let settings = with_groups(GroupListMode::Inclusion, &["G1"]);
        assert!(accept(&IncomingMessage::direct("alice@c.us", "hi"), &settings));
    }

    #[test]
    fn inclusion_takes_precedence_over_exclusion() {
        // Hand-built settings that bypass the setter's invariant.
        let settings = UserSettings {
            group_inclusion_list: BTreeSet::from(["G1".to_string()]),
            group_exclusion_list: BTreeSet::from(["G1".to_string()]),
            ..Default::default()
        };
        assert!(accept(&IncomingMessage::group("G1", "bob", "hi"), &settings));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let settings = with_groups(GroupListMode::Exclusion, &["G3"]);
        let messages = [
            IncomingMessage::group("G3", "bob", "a"),
            IncomingMessage::group("G4", "bob", "b"),
            IncomingMessage::direct("alice", "c"),
        ];
        for msg in &messages {
            let first = evaluate(msg, &settings);
            for _ in 0..5 {
                assert_eq!(evaluate(msg, &settings), first);
            }
        }
    }
}
