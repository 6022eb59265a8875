//! End-to-end tests for the shell and call actor.
//!
//! Uses `MockTransportFactory` so every transport command is observable and
//! notifications are delivered by the test:
//! - Intake to in-call to intake lifecycle
//! - Intents forwarded through the actor mailbox
//! - Teardown on leave, on transport rejection, and on shutdown

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::HashMap;
use std::time::Duration;

use call_client::config::Config;
use call_client::errors::{CallError, IntakeError, TransportError};
use call_client::shell::{CallShell, Screen};
use call_client::transport::{CallEvent, TrackKind};
use call_test_utils::*;

fn shell_with(transport: MockTransport) -> (CallShell<MockTransportFactory>, MockTransport) {
    let factory = MockTransportFactory::new(transport);
    let probe = factory.probe();
    (CallShell::new(factory, Config::default()), probe)
}

fn start_call(shell: &mut CallShell<MockTransportFactory>) {
    shell.intake_mut().set_name("  Alice ");
    shell.intake_mut().set_url("https://example.test/R1");
    shell.submit_intake().unwrap();
}

fn alice() -> TestParticipant {
    TestParticipant::new("alice")
        .name("Alice")
        .local()
        .video_playable("alice-v1")
        .audio_playable("alice-a1")
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_full_call_lifecycle() {
    let (mut shell, probe) = shell_with(MockTransport::default());
    start_call(&mut shell);
    assert_eq!(shell.screen(), Screen::InCall);
    assert_eq!(shell.factory().created(), 1);

    let joins: Vec<TransportCommand> = probe
        .commands()
        .into_iter()
        .filter(|c| matches!(c, TransportCommand::Join(_)))
        .collect();
    assert_eq!(joins.len(), 1);
    if let TransportCommand::Join(request) = &joins[0] {
        assert_eq!(request.user_name, "Alice");
        assert_eq!(request.url, "https://example.test/R1");
    }

    probe.emit(joined_meeting(alice().build()));
    let bob = TestParticipant::new("bob").name("Bob").video_playable("bob-v1");
    probe.emit(participant_joined(bob.build()));

    let call = shell.call().unwrap().clone();
    let state = call.get_state().await.unwrap();
    assert!(state.joined());
    let names: Vec<&str> = state
        .participants
        .iter()
        .map(|t| t.view.user_name.as_str())
        .collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
    assert!(state.participant("bob").unwrap().video_stream.is_some());

    probe.emit(track_stopped(bob.clone().video_off().build(), TrackKind::Video));
    let state = call.get_state().await.unwrap();
    assert!(!state.participant("bob").unwrap().view.video_ready);

    probe.emit(participant_left(&bob));
    let state = call.get_state().await.unwrap();
    assert_eq!(state.participants.len(), 1);

    call.leave().await.unwrap();
    assert_eq!(probe.count(|c| matches!(c, TransportCommand::Leave)), 1);
    assert!(!shell.poll_ended());

    probe.emit(CallEvent::LeftMeeting);
    tokio::time::timeout(Duration::from_secs(1), shell.wait_ended())
        .await
        .expect("call should end")
        .unwrap();

    assert_eq!(shell.screen(), Screen::Intake);
    assert_eq!(probe.destroy_count(), 1);
    assert_eq!(probe.subscriber_count(), 0);
    assert!(call.get_state().await.is_err());
}

#[tokio::test]
async fn test_second_call_after_first_ends() {
    let (mut shell, probe) = shell_with(MockTransport::default());
    start_call(&mut shell);
    probe.emit(joined_meeting(alice().build()));
    probe.emit(CallEvent::LeftMeeting);
    shell.wait_ended().await.unwrap();

    start_call(&mut shell);
    assert_eq!(shell.factory().created(), 2);
    let state = shell.call().unwrap().get_state().await.unwrap();
    assert!(!state.joined());
    assert!(state.participants.is_empty());

    shell.shutdown().await;
}

#[tokio::test]
async fn test_rejected_join_releases_transport() {
    let (mut shell, probe) = shell_with(MockTransport::builder().reject_join().build());
    shell.intake_mut().set_name("Alice");
    shell.intake_mut().set_url("https://example.test/missing");

    let err = shell.submit_intake().unwrap_err();

    assert!(matches!(
        err,
        CallError::Transport(TransportError::Rejected(_))
    ));
    assert_eq!(err.user_message(), "Something went wrong with the call");
    assert_eq!(shell.screen(), Screen::Intake);
    assert_eq!(probe.destroy_count(), 1);
    assert_eq!(probe.subscriber_count(), 0);
}

#[tokio::test]
async fn test_invalid_intake_creates_no_transport() {
    let (mut shell, _probe) = shell_with(MockTransport::default());
    shell.intake_mut().set_name("Alice");

    let err = shell.submit_intake().unwrap_err();

    assert!(matches!(err, CallError::Intake(IntakeError::MissingUrl)));
    assert_eq!(shell.factory().created(), 0);
    assert_eq!(shell.intake_mut().name(), "Alice");
}

#[tokio::test]
async fn test_go_home_after_fatal_error() {
    let (mut shell, probe) = shell_with(MockTransport::default());
    start_call(&mut shell);
    probe.emit(joined_meeting(alice().build()));
    probe.emit(fatal_error("meeting ended by host"));

    let state = shell.call().unwrap().get_state().await.unwrap();
    assert_eq!(state.error.as_deref(), Some("meeting ended by host"));

    shell.go_home().await.unwrap();
    let state = shell.call().unwrap().get_state().await.unwrap();
    assert!(state.error.is_none());
    assert_eq!(probe.count(|c| matches!(c, TransportCommand::Leave)), 1);

    probe.emit(CallEvent::LeftMeeting);
    shell.wait_ended().await.unwrap();
    assert_eq!(shell.screen(), Screen::Intake);
}

#[tokio::test]
async fn test_shutdown_releases_without_leaving() {
    let (mut shell, probe) = shell_with(MockTransport::default());
    start_call(&mut shell);
    probe.emit(joined_meeting(alice().build()));

    shell.shutdown().await;

    assert_eq!(shell.screen(), Screen::Intake);
    assert_eq!(probe.destroy_count(), 1);
    assert_eq!(probe.count(|c| matches!(c, TransportCommand::Leave)), 0);
}

// ============================================================================
// Intents through the actor
// ============================================================================

#[tokio::test]
async fn test_toggles_before_join_are_ignored() {
    let (mut shell, probe) = shell_with(MockTransport::default());
    start_call(&mut shell);
    let call = shell.call().unwrap().clone();

    assert!(!call.toggle_video().await.unwrap());
    assert!(!call.toggle_audio().await.unwrap());
    assert!(probe.media_commands().is_empty());

    probe.emit(joined_meeting(alice().build()));
    assert!(call.toggle_video().await.unwrap());
    assert_eq!(
        probe.media_commands(),
        vec![TransportCommand::SetLocalVideo(false)]
    );

    shell.shutdown().await;
}

#[tokio::test]
async fn test_chat_through_actor() {
    let (mut shell, probe) = shell_with(MockTransport::default());
    start_call(&mut shell);
    probe.emit(joined_meeting(alice().build()));
    probe.emit(chat_message("bob", "Bob", "hi Alice"));
    probe.emit(chat_history_request("carol"));

    let call = shell.call().unwrap().clone();
    call.set_chat_input("   ").await.unwrap();
    assert!(!call.send_chat().await.unwrap());
    call.set_chat_input(" hi Bob ").await.unwrap();
    assert!(!call.chat_key("Shift").await.unwrap());
    assert!(call.chat_key("Enter").await.unwrap());
    call.toggle_chat().await.unwrap();

    let state = call.get_state().await.unwrap();
    let lines: Vec<(&str, &str)> = state
        .chat
        .iter()
        .map(|m| (m.name.as_str(), m.message.as_str()))
        .collect();
    assert_eq!(lines, vec![("Bob", "hi Alice"), ("Me", "hi Bob")]);
    assert!(state.chat_open);
    assert!(state.chat_input.is_empty());
    assert_eq!(
        probe.sent_messages(),
        vec![serde_json::json!({ "message": "hi Bob", "name": "Alice" })]
    );

    shell.shutdown().await;
}

#[tokio::test]
async fn test_custom_chat_label_and_replay_policy_from_config() {
    let vars = HashMap::from([
        ("CALL_SELF_CHAT_LABEL".to_string(), "You".to_string()),
        ("CALL_EARLY_TRACK_POLICY".to_string(), "replay".to_string()),
    ]);
    let config = Config::from_vars(&vars).unwrap();
    let factory = MockTransportFactory::new(MockTransport::default());
    let probe = factory.probe();
    let mut shell = CallShell::new(factory, config);
    start_call(&mut shell);

    let bob = TestParticipant::new("bob");
    probe.emit(participant_joined(bob.build()));
    probe.emit(track_started(
        bob.clone().audio_playable("bob-a1").build(),
        TrackKind::Audio,
    ));
    probe.emit(joined_meeting(alice().build()));

    let call = shell.call().unwrap().clone();
    call.set_chat_input("hello").await.unwrap();
    call.send_chat().await.unwrap();

    let state = call.get_state().await.unwrap();
    assert!(state.participant("bob").unwrap().view.audio_ready);
    assert_eq!(state.chat[0].name, "You");

    shell.shutdown().await;
}
