//! liveness-runtime — Runs a liveness session on a dedicated thread.
//!
//! Frame pipelines hand observations to a [`SessionHandle`]; the session
//! thread processes them strictly in arrival order, one at a time.

use liveness_core::{
    CaptureTrigger, FrameObservation, LivenessSession, SessionConfig, SessionStatus, StepOutput,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Requests buffered ahead of the session thread before senders wait.
const REQUEST_QUEUE_DEPTH: usize = 8;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("failed to spawn session thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("session thread exited")]
    ChannelClosed,
}

/// Messages sent from handles to the session thread.
enum SessionRequest {
    Observe {
        observation: FrameObservation,
        reply: oneshot::Sender<StepOutput>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
}

/// Clone-safe handle to the session thread.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionRequest>,
}

impl SessionHandle {
    /// Feed one frame and wait for the resulting step.
    pub async fn observe(&self, observation: FrameObservation) -> Result<StepOutput, RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionRequest::Observe {
            observation,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Blocking variant of [`observe`](Self::observe) for frame-processor
    /// threads outside any async runtime. Panics if called from within one.
    pub fn observe_blocking(
        &self,
        observation: FrameObservation,
    ) -> Result<StepOutput, RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .blocking_send(SessionRequest::Observe {
                observation,
                reply: reply_tx,
            })
            .map_err(|_| RuntimeError::ChannelClosed)?;
        reply_rx.blocking_recv().map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Restart the challenge sequence and re-arm the capture trigger.
    pub async fn reset(&self) -> Result<(), RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionRequest::Reset { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    pub async fn status(&self) -> Result<SessionStatus, RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionRequest::Status { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    async fn send(&self, request: SessionRequest) -> Result<(), RuntimeError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| RuntimeError::ChannelClosed)
    }
}

/// Spawn a session on a dedicated OS thread.
///
/// The thread owns the session exclusively and exits once every handle
/// has been dropped.
pub fn spawn_session(
    config: Arc<SessionConfig>,
    trigger: impl CaptureTrigger + Send + 'static,
) -> Result<SessionHandle, RuntimeError> {
    let mut session = LivenessSession::new(config, trigger);
    let (tx, mut rx) = mpsc::channel::<SessionRequest>(REQUEST_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("liveness-session".into())
        .spawn(move || {
            tracing::info!("session thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    SessionRequest::Observe { observation, reply } => {
                        let step = session.observe(&observation);
                        let _ = reply.send(step);
                    }
                    SessionRequest::Reset { reply } => {
                        session.reset();
                        let _ = reply.send(());
                    }
                    SessionRequest::Status { reply } => {
                        let _ = reply.send(session.status());
                    }
                }
            }
            tracing::info!(verified = session.is_verified(), "session thread exiting");
        })?;

    Ok(SessionHandle { tx })
}
