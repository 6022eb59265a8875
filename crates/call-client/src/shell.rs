//! Owning UI shell.
//!
//! The shell switches between the intake screen and the in-call screen. On a
//! valid intake it creates a fresh transport from its factory, spawns a
//! [`CallActor`] and starts the join. When the actor reports that the call
//! ended, the shell drops the call and returns to intake.

use crate::actors::{CallActor, CallActorHandle};
use crate::config::Config;
use crate::errors::CallError;
use crate::intake::{JoinIntake, JoinRequest};
use crate::transport::TransportFactory;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Which screen the shell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Intake,
    InCall,
}

#[derive(Debug)]
struct ActiveCall {
    request: JoinRequest,
    handle: CallActorHandle,
    task: JoinHandle<()>,
}

/// UI shell owning the intake form and at most one active call.
#[derive(Debug)]
pub struct CallShell<F: TransportFactory> {
    factory: F,
    config: Config,
    intake: JoinIntake,
    active: Option<ActiveCall>,
    cancel_token: CancellationToken,
}

impl<F: TransportFactory> CallShell<F> {
    /// Create a shell on the intake screen.
    #[must_use]
    pub fn new(factory: F, config: Config) -> Self {
        Self {
            factory,
            config,
            intake: JoinIntake::new(),
            active: None,
            cancel_token: CancellationToken::new(),
        }
    }

    /// The screen currently shown.
    #[must_use]
    pub fn screen(&self) -> Screen {
        if self.active.is_some() {
            Screen::InCall
        } else {
            Screen::Intake
        }
    }

    /// The transport factory used for new calls.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Mutable access to the intake form buffers.
    pub fn intake_mut(&mut self) -> &mut JoinIntake {
        &mut self.intake
    }

    /// Handle to the active call, if any.
    #[must_use]
    pub fn call(&self) -> Option<&CallActorHandle> {
        self.active.as_ref().map(|a| &a.handle)
    }

    /// Name and room of the active call.
    #[must_use]
    pub fn active_request(&self) -> Option<&JoinRequest> {
        self.active.as_ref().map(|a| &a.request)
    }

    /// Validate the intake form and start a call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit_intake(&mut self) -> Result<&CallActorHandle, CallError> {
        if self.active.is_some() {
            return Err(CallError::CallAlreadyActive);
        }
        let request = self.intake.submit()?;
        let transport = self.factory.create();
        let (handle, task) = CallActor::spawn(
            transport,
            request.clone(),
            &self.config,
            self.cancel_token.child_token(),
        )?;
        info!(
            target: "call.shell",
            call_id = %handle.call_id(),
            user_name = %request.user_name,
            url = %request.url,
            "Call started"
        );
        let active = self.active.insert(ActiveCall {
            request,
            handle,
            task,
        });
        Ok(&active.handle)
    }

    /// Return to intake if the active call has ended. Returns whether it did.
    pub fn poll_ended(&mut self) -> bool {
        if !self.active.as_ref().is_some_and(|a| a.handle.has_ended()) {
            return false;
        }
        if let Some(active) = self.active.take() {
            info!(target: "call.shell", call_id = %active.handle.call_id(), "Call ended");
        }
        true
    }

    /// Wait for the active call to end, then return to intake.
    pub async fn wait_ended(&mut self) -> Result<(), CallError> {
        let Some(active) = self.active.as_ref() else {
            return Err(CallError::NoActiveCall);
        };
        active.handle.ended().await;
        if let Some(active) = self.active.take() {
            if let Err(e) = active.task.await {
                warn!(target: "call.shell", error = %e, "Call actor task failed");
            }
            info!(target: "call.shell", call_id = %active.handle.call_id(), "Call ended");
        }
        Ok(())
    }

    /// Error banner reset action: leave the active call.
    pub async fn go_home(&mut self) -> Result<(), CallError> {
        let Some(active) = self.active.as_ref() else {
            return Err(CallError::NoActiveCall);
        };
        if let Err(e) = active.handle.leave().await {
            // The transport cannot leave; release it directly.
            warn!(target: "call.shell", error = %e, "Leave failed, cancelling call");
            active.handle.cancel();
        }
        Ok(())
    }

    /// Cancel the active call and wait for its actor to stop.
    pub async fn shutdown(&mut self) {
        self.cancel_token.cancel();
        if let Some(active) = self.active.take() {
            if let Err(e) = active.task.await {
                warn!(target: "call.shell", error = %e, "Call actor task failed");
            }
        }
        self.intake.reset();
    }
}

impl<F: TransportFactory> Drop for CallShell<F> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::IntakeError;
    use crate::transport::{CallEvent, LoopbackFactory};
    use std::time::Duration;

    fn shell() -> CallShell<LoopbackFactory> {
        CallShell::new(LoopbackFactory::new("alice"), Config::default())
    }

    fn fill(shell: &mut CallShell<LoopbackFactory>) {
        shell.intake_mut().set_name("Alice");
        shell.intake_mut().set_url("https://example.test/R1");
    }

    #[tokio::test]
    async fn test_invalid_intake_stays_on_intake_screen() {
        let mut shell = shell();
        shell.intake_mut().set_url("https://example.test/R1");

        let err = shell.submit_intake().unwrap_err();

        assert!(matches!(err, CallError::Intake(IntakeError::MissingName)));
        assert_eq!(shell.screen(), Screen::Intake);
        assert!(shell.factory().remote().is_none());
    }

    #[tokio::test]
    async fn test_submit_starts_call_and_rejects_second_call() {
        let mut shell = shell();
        fill(&mut shell);
        shell.submit_intake().unwrap();
        assert_eq!(shell.screen(), Screen::InCall);
        assert_eq!(shell.active_request().unwrap().user_name, "Alice");
        assert!(shell.intake_mut().name().is_empty());

        fill(&mut shell);
        assert!(matches!(
            shell.submit_intake(),
            Err(CallError::CallAlreadyActive)
        ));

        shell.shutdown().await;
        assert_eq!(shell.screen(), Screen::Intake);
    }

    #[tokio::test]
    async fn test_go_home_returns_to_intake() {
        let mut shell = shell();
        fill(&mut shell);
        shell.submit_intake().unwrap();
        let remote = shell.factory().remote().unwrap();
        remote.inject(CallEvent::Error {
            message: Some("meeting expired".to_string()),
        });

        shell.go_home().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), shell.wait_ended())
            .await
            .expect("call should end")
            .unwrap();

        assert_eq!(shell.screen(), Screen::Intake);
        assert!(shell.active_request().is_none());
        assert!(remote.is_destroyed());
        assert!(matches!(shell.go_home().await, Err(CallError::NoActiveCall)));
    }

    #[tokio::test]
    async fn test_poll_ended_after_remote_leave() {
        let mut shell = shell();
        fill(&mut shell);
        shell.submit_intake().unwrap();
        assert!(!shell.poll_ended());

        shell.factory().remote().unwrap().inject(CallEvent::LeftMeeting);
        shell.call().unwrap().ended().await;

        assert!(shell.poll_ended());
        assert_eq!(shell.screen(), Screen::Intake);
    }
}
