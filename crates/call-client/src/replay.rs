//! Headless replay of a scripted call.
//!
//! A script names the local user and room, then lists steps: user intents,
//! chat submissions, and remote notifications injected through the loopback
//! transport. Steps run in order against a [`CallShell`]; the final snapshot
//! is returned as a [`ReplayReport`].
//!
//! ```json
//! {
//!   "user_name": "Alice",
//!   "url": "https://example.test/R1",
//!   "steps": [
//!     { "remote": { "event": "participant-joined", "participant": { "session_id": "bob", "user_name": "Bob" } } },
//!     { "chat": "hello" },
//!     { "intent": "toggle-video" }
//!   ]
//! }
//! ```

use crate::config::Config;
use crate::errors::CallError;
use crate::shell::CallShell;
use crate::synchronizer::CallSnapshot;
use crate::transport::{CallEvent, LoopbackFactory};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Session id of the local participant in replays.
pub const LOCAL_SESSION_ID: &str = "local";

/// A user intent in a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    ToggleVideo,
    ToggleAudio,
    Leave,
    ToggleChat,
}

/// One script step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Intent(Intent),
    /// Type `text` into the chat box and submit it.
    Chat(String),
    /// Deliver a notification as if it came from the network.
    Remote(CallEvent),
}

/// A replay script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub user_name: String,
    pub url: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub call_id: String,
    pub steps_run: usize,
    /// The call ended during the replay.
    pub ended: bool,
    /// Final state, absent if the call ended.
    pub snapshot: Option<CallSnapshot>,
}

/// Run `script` against a loopback transport.
///
/// Transport command failures are logged and the replay continues. Steps
/// after the call has ended are skipped.
pub async fn run(script: ReplayScript, config: Config) -> Result<ReplayReport, CallError> {
    let mut shell = CallShell::new(LoopbackFactory::new(LOCAL_SESSION_ID), config);
    shell.intake_mut().set_name(script.user_name);
    shell.intake_mut().set_url(script.url);
    let handle = shell.submit_intake()?.clone();
    let remote = shell
        .factory()
        .remote()
        .ok_or_else(|| CallError::Internal("loopback remote missing".to_string()))?;

    let mut steps_run = 0;
    for step in script.steps {
        if handle.has_ended() {
            info!(target: "call.replay", "Call ended, skipping remaining steps");
            break;
        }
        debug!(target: "call.replay", step = ?step, "Running step");
        let result = match step {
            Step::Intent(Intent::ToggleVideo) => handle.toggle_video().await.map(drop),
            Step::Intent(Intent::ToggleAudio) => handle.toggle_audio().await.map(drop),
            Step::Intent(Intent::Leave) => handle.leave().await,
            Step::Intent(Intent::ToggleChat) => handle.toggle_chat().await,
            Step::Chat(text) => match handle.set_chat_input(text).await {
                Ok(()) => handle.send_chat().await.map(drop),
                Err(e) => Err(e),
            },
            Step::Remote(event) => {
                remote.inject(event);
                Ok(())
            }
        };
        match result {
            Ok(()) => {}
            Err(CallError::Internal(_)) if handle.has_ended() => break,
            Err(e @ CallError::Internal(_)) => return Err(e),
            Err(e) => warn!(target: "call.replay", error = %e, "Step failed"),
        }
        steps_run += 1;
    }

    let snapshot = match handle.get_state().await {
        Ok(snapshot) => Some(snapshot),
        Err(_) if handle.has_ended() => None,
        Err(e) => return Err(e),
    };
    let ended = snapshot.is_none();
    shell.shutdown().await;

    Ok(ReplayReport {
        call_id: handle.call_id().to_string(),
        steps_run,
        ended,
        snapshot,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn script(steps: serde_json::Value) -> ReplayScript {
        serde_json::from_value(json!({
            "user_name": "Alice",
            "url": "https://example.test/R1",
            "steps": steps,
        }))
        .unwrap()
    }

    #[test]
    fn test_script_step_wire_format() {
        let script = script(json!([
            { "intent": "toggle-video" },
            { "chat": "hi" },
            { "remote": { "event": "left-meeting" } },
        ]));
        assert_eq!(
            script.steps,
            vec![
                Step::Intent(Intent::ToggleVideo),
                Step::Chat("hi".to_string()),
                Step::Remote(CallEvent::LeftMeeting),
            ]
        );
    }

    #[tokio::test]
    async fn test_replay_produces_final_snapshot() {
        let script = script(json!([
            { "remote": { "event": "participant-joined", "participant": {
                "session_id": "bob", "user_name": "Bob",
                "tracks": { "video": { "state": "playable",
                    "persistent_track": { "id": "bob-v1", "kind": "video" } } }
            } } },
            { "remote": { "event": "app-message", "data": { "message": "hey", "name": "Bob" } } },
            { "chat": "hi Bob" },
            { "intent": "toggle-chat" },
            { "intent": "toggle-audio" },
        ]));

        let report = run(script, Config::default()).await.unwrap();

        assert!(!report.ended);
        assert_eq!(report.steps_run, 5);
        let snapshot = report.snapshot.unwrap();
        assert!(snapshot.chat_open);
        assert_eq!(snapshot.participants.len(), 2);
        assert_eq!(snapshot.participants[0].view.id.as_str(), LOCAL_SESSION_ID);
        assert!(!snapshot.participants[0].view.audio_ready);
        assert!(snapshot.participant("bob").unwrap().view.video_ready);
        let chat: Vec<&str> = snapshot.chat.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(chat, vec!["Bob", "Me"]);
    }

    #[tokio::test]
    async fn test_replay_stops_after_leave() {
        let script = script(json!([
            { "intent": "leave" },
            { "intent": "toggle-video" },
            { "chat": "too late" },
        ]));

        let report = run(script, Config::default()).await.unwrap();

        assert!(report.ended);
        assert!(report.snapshot.is_none());
        assert!(report.steps_run < 3);
    }

    #[tokio::test]
    async fn test_replay_rejects_invalid_intake() {
        let mut script = script(json!([]));
        script.url = "   ".to_string();
        let err = run(script, Config::default()).await.unwrap_err();
        assert_eq!(err.user_message(), "Room URL is required");
    }
}
