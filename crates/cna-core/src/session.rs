//! Analytics session
//!
//! One tokio task owns the contract store, the metrics engine, the transition
//! scheduler and the publisher. Callers talk to it through a
//! [`SessionHandle`]; every mutation is serialized through the command
//! channel so no animation state is shared across tasks.
//!
//! The tick interval is only polled while something animates. Dropping the
//! handle cancels the session token and no tick runs afterwards.

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::publisher::{FrameSubscription, ViewModelPublisher};
use crate::types::{SessionId, SubscriberId};
use cna_contract::{ContractEdit, ContractError, ContractSnapshot, ContractStore};
use cna_metrics::{build_series, DerivedMetrics, MarketConfig, MetricsEngine};
use cna_transition::{CancellationToken, TickOutcome, TransitionScheduler};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

/// Commands accepted by the session task
#[derive(Debug)]
pub enum SessionCommand {
    /// Apply a string-keyed field edit
    Edit {
        field: String,
        value: serde_json::Value,
        reply: oneshot::Sender<Result<Arc<ContractSnapshot>, ContractError>>,
    },
    /// Apply a typed edit
    Apply {
        edit: ContractEdit,
        reply: oneshot::Sender<Result<Arc<ContractSnapshot>, ContractError>>,
    },
    /// Register a frame subscriber
    Subscribe {
        reply: oneshot::Sender<FrameSubscription>,
    },
    /// Remove a frame subscriber
    Unsubscribe {
        id: SubscriberId,
        reply: oneshot::Sender<bool>,
    },
    /// Read the current snapshot
    Snapshot {
        reply: oneshot::Sender<Arc<ContractSnapshot>>,
    },
    /// Stop the session
    Shutdown,
}

/// Handle to a running session
///
/// Not cloneable: dropping it tears the session down.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::Sender<SessionCommand>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Whether the session task has stopped accepting commands
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled() || self.commands.is_closed()
    }

    /// Apply an edit and wait for the new snapshot
    ///
    /// # Errors
    /// - `Contract` if the store rejects the edit
    /// - `SessionClosed` if the session has stopped
    pub async fn edit(
        &self,
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<Arc<ContractSnapshot>, AnalyticsError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Edit {
            field: field.into(),
            value,
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| AnalyticsError::SessionClosed)??)
    }

    /// Apply a typed edit and wait for the new snapshot
    ///
    /// # Errors
    /// - `Contract` if the store rejects the edit
    /// - `SessionClosed` if the session has stopped
    pub async fn apply(&self, edit: ContractEdit) -> Result<Arc<ContractSnapshot>, AnalyticsError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Apply { edit, reply }).await?;
        Ok(rx.await.map_err(|_| AnalyticsError::SessionClosed)??)
    }

    /// Subscribe to frames; the latest frame arrives first
    ///
    /// # Errors
    /// `SessionClosed` if the session has stopped
    pub async fn subscribe(&self) -> Result<FrameSubscription, AnalyticsError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Subscribe { reply }).await?;
        rx.await.map_err(|_| AnalyticsError::SessionClosed)
    }

    /// Unsubscribe; returns whether the subscriber was registered
    ///
    /// # Errors
    /// `SessionClosed` if the session has stopped
    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<bool, AnalyticsError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Unsubscribe { id, reply }).await?;
        rx.await.map_err(|_| AnalyticsError::SessionClosed)
    }

    /// Current contract snapshot
    ///
    /// # Errors
    /// `SessionClosed` if the session has stopped
    pub async fn snapshot(&self) -> Result<Arc<ContractSnapshot>, AnalyticsError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| AnalyticsError::SessionClosed)
    }

    /// Stop the session and wait for its task to finish
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(session = %self.id, error = %e, "Session task ended abnormally");
            }
        }
    }

    async fn send(&self, command: SessionCommand) -> Result<(), AnalyticsError> {
        if self.token.is_cancelled() {
            return Err(AnalyticsError::SessionClosed);
        }
        self.commands
            .send(command)
            .await
            .map_err(|_| AnalyticsError::SessionClosed)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Session state, owned by the session task
pub struct AnalyticsSession {
    id: SessionId,
    store: ContractStore,
    engine: MetricsEngine,
    market: Arc<MarketConfig>,
    scheduler: TransitionScheduler,
    publisher: ViewModelPublisher,
    metrics: DerivedMetrics,
}

impl AnalyticsSession {
    /// Open the contract, publish the first frame and start the session task
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Invalid configuration or an upload the store rejects
    pub fn spawn(
        snapshot: ContractSnapshot,
        config: AnalyticsConfig,
    ) -> Result<SessionHandle, AnalyticsError> {
        config.validate()?;

        let token = CancellationToken::new();
        let market = Arc::new(config.market.clone());
        let store = ContractStore::open(snapshot)?;
        let mut engine = MetricsEngine::new(Arc::clone(&market), config.signal_provider());
        let metrics = engine.derive(&store.current())?;
        let mut scheduler = TransitionScheduler::new(config.transition)?.with_token(token.clone());
        scheduler.retarget(build_series(&store.current(), &market)?)?;

        let session = Self {
            id: SessionId::new(),
            store,
            engine,
            market,
            scheduler,
            publisher: ViewModelPublisher::with_capacity(config.frame_buffer),
            metrics,
        };
        session.publish();

        let id = session.id;
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let task = tokio::spawn(session.run(rx, token.clone()));
        tracing::info!(session = %id, "Analytics session started");

        Ok(SessionHandle {
            id,
            commands: tx,
            token,
            task: Some(task),
        })
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.scheduler.config().tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if self.handle(command, &mut ticker).is_break() {
                        break;
                    }
                }
                _ = ticker.tick(), if self.scheduler.is_animating() => self.on_tick(),
            }
        }

        token.cancel();
        tracing::info!(session = %self.id, revision = self.store.revision(), "Analytics session stopped");
    }

    fn handle(&mut self, command: SessionCommand, ticker: &mut Interval) -> ControlFlow<()> {
        match command {
            SessionCommand::Edit { field, value, reply } => {
                let result = self
                    .store
                    .apply_edit(&field, value)
                    .and_then(|snapshot| self.refresh(snapshot, ticker));
                let _ = reply.send(result);
            }
            SessionCommand::Apply { edit, reply } => {
                let result = self
                    .store
                    .apply(edit)
                    .and_then(|snapshot| self.refresh(snapshot, ticker));
                let _ = reply.send(result);
            }
            SessionCommand::Subscribe { reply } => {
                let _ = reply.send(self.publisher.subscribe());
            }
            SessionCommand::Unsubscribe { id, reply } => {
                let removed = self.publisher.unsubscribe(id);
                if removed && self.publisher.subscriber_count() == 0 {
                    self.settle();
                }
                let _ = reply.send(removed);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.store.current());
            }
            SessionCommand::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Recompute metrics and targets for a freshly published snapshot
    fn refresh(
        &mut self,
        snapshot: Arc<ContractSnapshot>,
        ticker: &mut Interval,
    ) -> Result<Arc<ContractSnapshot>, ContractError> {
        self.metrics = self.engine.derive(&snapshot)?;
        let targets = build_series(&snapshot, &self.market)?;

        let was_animating = self.scheduler.is_animating();
        match self.scheduler.retarget(targets) {
            Ok(started) => {
                if started > 0 && !was_animating {
                    // first step lands one interval after the edit
                    ticker.reset();
                }
            }
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "Retarget failed, showing targets");
                self.settle();
            }
        }

        self.publish();
        Ok(snapshot)
    }

    fn on_tick(&mut self) {
        match self.scheduler.tick() {
            Ok(TickOutcome::Cancelled | TickOutcome::Idle) => {}
            Ok(_) => {
                self.publish();
                if self.publisher.subscriber_count() == 0 {
                    // every receiver was dropped; nobody left to watch
                    self.settle();
                }
            }
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "Animation step failed, showing targets");
                self.settle();
            }
        }
    }

    /// Cut animations short and record the settled frame
    fn settle(&mut self) {
        match self.scheduler.settle_all() {
            Ok(0) => {}
            Ok(_) => self.publish(),
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "Failed to settle animations");
            }
        }
    }

    fn publish(&self) {
        self.publisher.publish(
            self.store.revision(),
            self.metrics.clone(),
            self.scheduler.current(),
            self.scheduler.is_animating(),
        );
    }
}

impl std::fmt::Debug for AnalyticsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsSession")
            .field("id", &self.id)
            .field("revision", &self.store.revision())
            .field("animating", &self.scheduler.is_animating())
            .finish_non_exhaustive()
    }
}
