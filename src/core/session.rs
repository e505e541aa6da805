// Session management - explicit per-session context, spawning and cancellation

use crate::core::config::{Config, StreamConfig};
use crate::core::frame_analyzer::FrameAnalyzer;
use crate::core::publish_loop::{LoopDependencies, LoopState, PublishLoop, SessionReport};
use crate::models::pose::PoseError;
use crate::platform::capture::{create_frame_source, FrameSource};
use crate::platform::pose::{DefaultMediaPipe, InferenceBridge};
use crate::platform::transport::StreamTransport;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Collaborators shared by every session
pub struct SessionContext {
    pub source: Arc<dyn FrameSource>,
    pub bridge: Arc<dyn InferenceBridge>,
    pub analyzer: Arc<FrameAnalyzer>,
    pub stream: StreamConfig,
}

impl SessionContext {
    pub fn new(
        source: Arc<dyn FrameSource>,
        bridge: Arc<dyn InferenceBridge>,
        stream: StreamConfig,
    ) -> Self {
        Self {
            source,
            bridge,
            analyzer: Arc::new(FrameAnalyzer::new()),
            stream,
        }
    }

    /// Build the configured frame source and the default inference backend
    pub fn from_config(config: &Config) -> SessionResult<Self> {
        let source = create_frame_source(
            config.camera.source,
            config.camera.width,
            config.camera.height,
            config.camera.fps,
        );
        let bridge = DefaultMediaPipe::new(&config.pose)?;
        tracing::info!("Inference backend: {}", bridge.model_info());

        Ok(Self::new(source, Arc::new(bridge), config.stream.clone()))
    }

    fn loop_dependencies(&self) -> LoopDependencies {
        LoopDependencies {
            source: self.source.clone(),
            bridge: self.bridge.clone(),
            analyzer: self.analyzer.clone(),
            settings: self.stream.clone(),
        }
    }
}

/// Owner's view of a running session. Dropping the handle cancels the session.
pub struct SessionHandle {
    session_id: String,
    cancel_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<LoopState>,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Request shutdown; the loop closes its transport and finishes at the next suspension point
    pub fn cancel(&self) {
        // Fails only when the loop already finished
        let _ = self.cancel_tx.send(true);
    }

    pub fn state(&self) -> LoopState {
        *self.state_rx.borrow()
    }

    /// Wait for the session to finish
    pub async fn join(self) -> SessionResult<SessionReport> {
        let SessionHandle { task, cancel_tx, .. } = self;
        let result = task.await;
        drop(cancel_tx);
        result.map_err(|e| SessionError::TaskFailed(e.to_string()))
    }
}

/// Start a publish loop for `session_id` on its own task
pub fn spawn_session(
    ctx: &SessionContext,
    session_id: String,
    transport: Box<dyn StreamTransport>,
) -> SessionHandle {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (state_tx, state_rx) = watch::channel(LoopState::Connected);

    let publish_loop = PublishLoop::new(
        session_id.clone(),
        ctx.loop_dependencies(),
        transport,
        cancel_rx,
        state_tx,
    );
    let task = tokio::spawn(publish_loop.run());

    SessionHandle {
        session_id,
        cancel_tx,
        state_rx,
        task,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Inference backend unavailable: {0}")]
    Inference(#[from] PoseError),

    #[error("Session task failed: {0}")]
    TaskFailed(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
