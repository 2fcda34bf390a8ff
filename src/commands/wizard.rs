//! Group wizard: a per-user, multi-step flow that writes the group
//! inclusion or exclusion list.
//!
//! Idle → AwaitingType → AwaitingSelection → Idle. Sessions expire after a
//! TTL; a background sweep removes them and lookups treat an expired session
//! as absent.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::channels::Channel;
use crate::error::WizardError;
use crate::settings::{GroupListMode, SettingsService};

/// Session lifetime.
pub const SESSION_TTL_MINUTES: i64 = 30;

/// How often the sweep task runs.
pub const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

const MODE_PROMPT: &str = "Let's choose which groups I watch.\n\
    Reply with:\n\
    !set groups 1 - inclusion list (only the groups you pick)\n\
    !set groups 2 - exclusion list (every group except the ones you pick)\n\
    !set groups cancel - stop";

/// A group offered for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCandidate {
    pub id: String,
    pub name: String,
}

/// Where a user is in the flow.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WizardState {
    #[default]
    Idle,
    AwaitingType,
    AwaitingSelection {
        mode: GroupListMode,
        candidates: Vec<GroupCandidate>,
    },
}

#[derive(Debug, Clone)]
struct Session {
    state: WizardState,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Parse the list-type reply.
fn parse_mode(input: &str) -> Option<GroupListMode> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "inclusion" => Some(GroupListMode::Inclusion),
        "2" | "exclusion" => Some(GroupListMode::Exclusion),
        _ => None,
    }
}

/// Map comma-separated 1-based indices to candidates. Invalid, out-of-range
/// and duplicate entries are dropped.
fn select_candidates<'a>(input: &str, candidates: &'a [GroupCandidate]) -> Vec<&'a GroupCandidate> {
    let mut seen = BTreeSet::new();
    input
        .split(',')
        .filter_map(|part| part.trim().parse::<usize>().ok())
        .filter(|&i| i >= 1 && i <= candidates.len())
        .filter(|&i| seen.insert(i))
        .map(|i| &candidates[i - 1])
        .collect()
}

fn selection_prompt(mode: GroupListMode, candidates: &[GroupCandidate]) -> String {
    let mut text = format!(
        "Pick the groups for the {mode} list. Reply with !set groups <numbers>, e.g. !set groups 1,3\n"
    );
    for (i, group) in candidates.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, group.name));
    }
    text.trim_end().to_string()
}

/// In-memory wizard session store.
pub struct GroupWizard {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: TimeDelta,
}

impl Default for GroupWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupWizard {
    pub fn new() -> Self {
        Self::with_ttl(TimeDelta::minutes(SESSION_TTL_MINUTES))
    }

    pub fn with_ttl(ttl: TimeDelta) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// The user's current state.
    pub async fn state(&self, user: &str) -> WizardState {
        self.state_at(user, Utc::now()).await
    }

    async fn state_at(&self, user: &str, now: DateTime<Utc>) -> WizardState {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(user) {
            Some(session) if session.is_expired(now) => {
                sessions.remove(user);
                debug!(user, "Dropped expired wizard session on lookup");
                WizardState::Idle
            }
            Some(session) => session.state.clone(),
            None => WizardState::Idle,
        }
    }

    async fn set_state_at(&self, user: &str, state: WizardState, now: DateTime<Utc>) {
        let session = Session {
            state,
            expires_at: now + self.ttl,
        };
        self.sessions.lock().await.insert(user.to_string(), session);
    }

    async fn clear(&self, user: &str) -> bool {
        self.sessions.lock().await.remove(user).is_some()
    }

    /// Remove every expired session. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        let removed = before - sessions.len();
        if removed > 0 {
            info!(count = removed, "Expired wizard sessions");
        }
        removed
    }

    /// Number of live (possibly expired but unswept) sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Handle `!set groups [args]` from `user`. Returns the reply text.
    pub async fn handle(
        &self,
        user: &str,
        args: &str,
        channel: &dyn Channel,
        settings: &SettingsService,
    ) -> String {
        self.handle_at(user, args, channel, settings, Utc::now()).await
    }

    async fn handle_at(
        &self,
        user: &str,
        args: &str,
        channel: &dyn Channel,
        settings: &SettingsService,
        now: DateTime<Utc>,
    ) -> String {
        let args = args.trim();

        if args.is_empty() {
            self.set_state_at(user, WizardState::AwaitingType, now).await;
            info!(user, "Group wizard started");
            return MODE_PROMPT.to_string();
        }

        if args.eq_ignore_ascii_case("cancel") {
            return if self.clear(user).await {
                info!(user, "Group wizard cancelled");
                "Group setup cancelled.".to_string()
            } else {
                WizardError::NoSession.to_string()
            };
        }

        match self.state_at(user, now).await {
            WizardState::Idle => WizardError::NoSession.to_string(),
            WizardState::AwaitingType => self.choose_mode(user, args, channel, now).await,
            WizardState::AwaitingSelection { mode, candidates } => {
                self.choose_groups(user, args, mode, &candidates, settings)
                    .await
            }
        }
    }

    async fn choose_mode(
        &self,
        user: &str,
        args: &str,
        channel: &dyn Channel,
        now: DateTime<Utc>,
    ) -> String {
        let Some(mode) = parse_mode(args) else {
            return WizardError::UnknownMode(args.to_string()).to_string();
        };

        let candidates: Vec<GroupCandidate> = match channel.get_chats().await {
            Ok(chats) => chats
                .into_iter()
                .filter(|c| c.is_group)
                .map(|c| GroupCandidate {
                    name: if c.name.is_empty() { c.id.clone() } else { c.name },
                    id: c.id,
                })
                .collect(),
            Err(e) => {
                warn!(user, error = %e, "Failed to fetch chats for group wizard");
                return format!("Could not fetch your group chats ({e}). Try !set groups {args} again.");
            }
        };

        if candidates.is_empty() {
            self.clear(user).await;
            return WizardError::NoGroups.to_string();
        }

        let prompt = selection_prompt(mode, &candidates);
        debug!(user, %mode, count = candidates.len(), "Group wizard awaiting selection");
        self.set_state_at(user, WizardState::AwaitingSelection { mode, candidates }, now)
            .await;
        prompt
    }

    async fn choose_groups(
        &self,
        user: &str,
        args: &str,
        mode: GroupListMode,
        candidates: &[GroupCandidate],
        settings: &SettingsService,
    ) -> String {
        let selected = select_candidates(args, candidates);
        if selected.is_empty() {
            return WizardError::NoValidSelection {
                input: args.to_string(),
                max: candidates.len(),
            }
            .to_string();
        }

        let ids: BTreeSet<String> = selected.iter().map(|g| g.id.clone()).collect();
        settings.update(|s| s.set_group_filter(mode, ids)).await;
        self.clear(user).await;
        info!(user, %mode, count = selected.len(), "Group list saved");

        let mut reply = format!("Saved {} group(s) to the {mode} list:", selected.len());
        for group in &selected {
            reply.push_str(&format!("\n• {}", group.name));
        }
        reply
    }
}

/// Spawn a background task that periodically removes expired sessions.
pub fn spawn_sweep_task(wizard: Arc<GroupWizard>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            wizard.sweep_expired().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;
    use crate::test_support::FakeChannel;

    fn groups() -> FakeChannel {
        FakeChannel::new("me@c.us")
            .with_chat("G1@g.us", "Rustaceans", true)
            .with_chat("alice@c.us", "Alice", false)
            .with_chat("G2@g.us", "Book Club", true)
            .with_chat("G3@g.us", "", true)
    }

    async fn settings() -> (Arc<MemoryStore>, SettingsService) {
        let store = Arc::new(MemoryStore::new());
        let service = SettingsService::open(store.clone()).await;
        (store, service)
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(parse_mode("1"), Some(GroupListMode::Inclusion));
        assert_eq!(parse_mode(" Inclusion "), Some(GroupListMode::Inclusion));
        assert_eq!(parse_mode("2"), Some(GroupListMode::Exclusion));
        assert_eq!(parse_mode("EXCLUSION"), Some(GroupListMode::Exclusion));
        assert_eq!(parse_mode("3"), None);
        assert_eq!(parse_mode("both"), None);
    }

    #[test]
    fn selection_drops_invalid_entries() {
        let candidates = vec![
            GroupCandidate { id: "a".into(), name: "A".into() },
            GroupCandidate { id: "b".into(), name: "B".into() },
            GroupCandidate { id: "c".into(), name: "C".into() },
        ];
        let picked: Vec<_> = select_candidates("3, 0, x, 1, 7, 3", &candidates)
            .into_iter()
            .map(|g| g.id.as_str())
            .collect();
        assert_eq!(picked, vec!["c", "a"]);
        assert!(select_candidates("0,4,-1", &candidates).is_empty());
    }

    #[tokio::test]
    async fn full_inclusion_flow() {
        let channel = groups();
        let (store, settings) = settings().await;
        let wizard = GroupWizard::new();

        let reply = wizard.handle("me", "", &channel, &settings).await;
        assert!(reply.contains("!set groups 1"));
        assert_eq!(wizard.state("me").await, WizardState::AwaitingType);

        let reply = wizard.handle("me", "1", &channel, &settings).await;
        assert!(reply.contains("1. Rustaceans"));
        assert!(reply.contains("2. Book Club"));
        assert!(reply.contains("3. G3@g.us"), "unnamed groups show their id");
        assert!(!reply.contains("Alice"), "direct chats are not candidates");
        assert!(matches!(
            wizard.state("me").await,
            WizardState::AwaitingSelection { mode: GroupListMode::Inclusion, .. }
        ));

        let reply = wizard.handle("me", "1, 3", &channel, &settings).await;
        assert!(reply.contains("Saved 2 group(s) to the inclusion list"));
        assert_eq!(wizard.state("me").await, WizardState::Idle);

        let stored = store.stored().await;
        assert_eq!(
            stored.group_inclusion_list,
            BTreeSet::from(["G1@g.us".to_string(), "G3@g.us".to_string()])
        );
        assert!(stored.group_exclusion_list.is_empty());
    }

    #[tokio::test]
    async fn exclusion_flow_clears_inclusion_list() {
        let channel = groups();
        let (store, settings) = settings().await;
        settings
            .update(|s| s.set_group_filter(GroupListMode::Inclusion, BTreeSet::from(["G1@g.us".to_string()])))
            .await;
        let wizard = GroupWizard::new();

        wizard.handle("me", "", &channel, &settings).await;
        wizard.handle("me", "exclusion", &channel, &settings).await;
        wizard.handle("me", "2", &channel, &settings).await;

        let stored = store.stored().await;
        assert!(stored.group_inclusion_list.is_empty());
        assert_eq!(
            stored.group_exclusion_list,
            BTreeSet::from(["G2@g.us".to_string()])
        );
    }

    #[tokio::test]
    async fn unknown_mode_reprompts_and_keeps_session() {
        let channel = groups();
        let (_store, settings) = settings().await;
        let wizard = GroupWizard::new();

        wizard.handle("me", "", &channel, &settings).await;
        let reply = wizard.handle("me", "both", &channel, &settings).await;
        assert!(reply.contains("Unknown list type"));
        assert_eq!(wizard.state("me").await, WizardState::AwaitingType);
    }

    #[tokio::test]
    async fn invalid_selection_keeps_session() {
        let channel = groups();
        let (store, settings) = settings().await;
        let wizard = GroupWizard::new();

        wizard.handle("me", "", &channel, &settings).await;
        wizard.handle("me", "1", &channel, &settings).await;
        let reply = wizard.handle("me", "9, zero", &channel, &settings).await;

        assert!(reply.contains("between 1 and 3"));
        assert!(matches!(
            wizard.state("me").await,
            WizardState::AwaitingSelection { .. }
        ));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn reply_without_session_is_rejected() {
        let channel = groups();
        let (_store, settings) = settings().await;
        let wizard = GroupWizard::new();

        let reply = wizard.handle("me", "1", &channel, &settings).await;
        assert!(reply.contains("No group setup in progress"));
        assert_eq!(wizard.state("me").await, WizardState::Idle);
    }

    #[tokio::test]
    async fn cancel_destroys_session() {
        let channel = groups();
        let (_store, settings) = settings().await;
        let wizard = GroupWizard::new();

        wizard.handle("me", "", &channel, &settings).await;
        assert_eq!(
            wizard.handle("me", "CANCEL", &channel, &settings).await,
            "Group setup cancelled."
        );
        assert_eq!(wizard.state("me").await, WizardState::Idle);
        assert!(wizard.is_empty().await);
    }

    #[tokio::test]
    async fn no_groups_ends_session() {
        let channel = FakeChannel::new("me@c.us").with_chat("alice@c.us", "Alice", false);
        let (_store, settings) = settings().await;
        let wizard = GroupWizard::new();

        wizard.handle("me", "", &channel, &settings).await;
        let reply = wizard.handle("me", "1", &channel, &settings).await;
        assert_eq!(reply, WizardError::NoGroups.to_string());
        assert_eq!(wizard.state("me").await, WizardState::Idle);
    }

    #[tokio::test]
    async fn chat_fetch_failure_keeps_awaiting_type() {
        let channel = groups().failing_chats("offline");
        let (_store, settings) = settings().await;
        let wizard = GroupWizard::new();

        wizard.handle("me", "", &channel, &settings).await;
        let reply = wizard.handle("me", "1", &channel, &settings).await;
        assert!(reply.contains("Could not fetch"));
        assert_eq!(wizard.state("me").await, WizardState::AwaitingType);
    }

    #[tokio::test]
    async fn sessions_are_per_user() {
        let channel = groups();
        let (_store, settings) = settings().await;
        let wizard = GroupWizard::new();

        wizard.handle("a", "", &channel, &settings).await;
        assert_eq!(wizard.state("a").await, WizardState::AwaitingType);
        assert_eq!(wizard.state("b").await, WizardState::Idle);
    }

    #[tokio::test]
    async fn session_unreachable_after_ttl() {
        let channel = groups();
        let (_store, settings) = settings().await;
        let wizard = GroupWizard::with_ttl(TimeDelta::minutes(30));
        let t0 = Utc::now();

        wizard
            .handle_at("me", "", &channel, &settings, t0)
            .await;
        let just_before = t0 + TimeDelta::minutes(30) - TimeDelta::seconds(1);
        assert_eq!(wizard.state_at("me", just_before).await, WizardState::AwaitingType);

        let after = t0 + TimeDelta::minutes(30) + TimeDelta::milliseconds(1);
        assert_eq!(wizard.state_at("me", after).await, WizardState::Idle);

        // A reply after expiry does not resurrect the old session.
        let reply = wizard
            .handle_at("me", "1", &channel, &settings, after)
            .await;
        assert!(reply.contains("No group setup in progress"));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_sessions() {
        let channel = groups();
        let (_store, settings) = settings().await;
        let wizard = GroupWizard::with_ttl(TimeDelta::minutes(30));
        let t0 = Utc::now();

        wizard.handle_at("old", "", &channel, &settings, t0).await;
        wizard
            .handle_at("new", "", &channel, &settings, t0 + TimeDelta::minutes(20))
            .await;

        let removed = wizard.sweep_at(t0 + TimeDelta::minutes(31)).await;
        assert_eq!(removed, 1);
        assert_eq!(wizard.len().await, 1);
        assert_eq!(
            wizard.state_at("new", t0 + TimeDelta::minutes(31)).await,
            WizardState::AwaitingType
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_task_clears_idle_sessions_every_interval() {
        let channel = groups();
        let (_store, settings) = settings().await;
        // Zero TTL: the session is expired as soon as it exists.
        let wizard = Arc::new(GroupWizard::with_ttl(TimeDelta::zero()));
        let sweep = spawn_sweep_task(Arc::clone(&wizard));

        // Let the immediate first tick pass before opening a session.
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        wizard.handle("me", "", &channel, &settings).await;
        assert_eq!(wizard.len().await, 1);

        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        assert_eq!(wizard.len().await, 1, "no sweep before the interval elapses");

        tokio::time::sleep(SWEEP_INTERVAL).await;
        assert_eq!(wizard.len().await, 0);

        sweep.abort();
    }

    #[tokio::test]
    async fn mode_choice_refreshes_expiry() {
        let channel = groups();
        let (_store, settings) = settings().await;
        let wizard = GroupWizard::with_ttl(TimeDelta::minutes(30));
        let t0 = Utc::now();

        wizard.handle_at("me", "", &channel, &settings, t0).await;
        wizard
            .handle_at("me", "1", &channel, &settings, t0 + TimeDelta::minutes(25))
            .await;

        let later = t0 + TimeDelta::minutes(40);
        assert!(matches!(
            wizard.state_at("me", later).await,
            WizardState::AwaitingSelection { .. }
        ));
    }
}
