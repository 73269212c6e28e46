//! Refresh coordination.
//!
//! At most one pass runs at a time. A refresh requested while a pass is
//! running is remembered, and any number of such requests collapse into a
//! single follow-up pass.
//!
//! ```text
//!          refresh()                 refresh()
//!   Idle ───────────► Running ─────────────────► RunningPendingRerun
//!    ▲                  │  ▲                              │
//!    │   pass done      │  │     pass done (rerun)        │
//!    └──────────────────┘  └──────────────────────────────┘
//! ```
//!
//! Each pass runs as its own task, so a panic anywhere inside it (platform
//! calls included) fails that pass and the state machine moves on. Listener
//! delivery is detached from the pass; [`RefreshCoordinator::wait_notified`]
//! waits for it separately.

use crate::error::{MirrorError, Result};
use crate::notifier::Notifier;
use crate::reconcile::{PassReport, Reconciler};
use crate::remote::SnapshotBuilder;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Where the coordinator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshStatus {
    Idle,
    Running,
    /// Running, with another pass queued behind the current one.
    RunningPendingRerun,
}

impl RefreshStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, RefreshStatus::Idle)
    }
}

/// What a call to [`RefreshCoordinator::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    /// A new pass was started.
    Started,
    /// A pass was already running; a rerun is queued.
    Coalesced,
}

#[derive(Debug, Default)]
struct State {
    running: bool,
    pending: bool,
    started: u64,
    completed: u64,
    last_report: Option<PassReport>,
    last_error: Option<String>,
    had_changes: bool,
}

struct Inner {
    handle: Handle,
    snapshots: SnapshotBuilder,
    reconciler: Reconciler,
    notifier: Notifier,
    state: Mutex<State>,
    status: watch::Sender<RefreshStatus>,
    deliveries: Mutex<Vec<JoinHandle<()>>>,
}

/// Runs reconciliation passes in the background, one at a time.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// Create a coordinator that spawns its passes onto `handle`.
    pub fn new(
        handle: Handle,
        snapshots: SnapshotBuilder,
        reconciler: Reconciler,
        notifier: Notifier,
    ) -> Self {
        let (status, _) = watch::channel(RefreshStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                handle,
                snapshots,
                reconciler,
                notifier,
                state: Mutex::new(State::default()),
                status,
                deliveries: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Request a pass. Never blocks; callable from any thread.
    pub fn refresh(&self) -> RefreshRequest {
        let mut state = self.inner.state();
        if state.running {
            if !state.pending {
                debug!("Pass in progress, queueing a rerun");
            }
            state.pending = true;
            self.inner.status.send_replace(RefreshStatus::RunningPendingRerun);
            return RefreshRequest::Coalesced;
        }

        state.running = true;
        self.inner.status.send_replace(RefreshStatus::Running);
        drop(state);

        let inner = Arc::clone(&self.inner);
        self.inner.handle.spawn(async move { inner.drive().await });
        RefreshRequest::Started
    }

    pub fn status(&self) -> RefreshStatus {
        *self.inner.status.borrow()
    }

    /// Resolve once no pass is running or queued.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.status.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|status| status.is_idle()).await;
    }

    /// Resolve once every change notification published so far has been
    /// delivered. Pair with [`wait_idle`](Self::wait_idle) to know that
    /// listeners have heard about the last pass.
    pub async fn wait_notified(&self) {
        let pending = std::mem::take(&mut *self.inner.deliveries());
        for delivery in pending {
            if let Err(e) = delivery.await {
                warn!("Change notification task failed: {}", e);
            }
        }
    }

    /// Report of the most recent successful pass.
    pub fn last_report(&self) -> Option<PassReport> {
        self.inner.state().last_report.clone()
    }

    /// Failure message of the most recent pass, if it failed.
    pub fn last_error(&self) -> Option<String> {
        self.inner.state().last_error.clone()
    }

    /// Whether the most recent pass changed either library.
    pub fn had_changes_last_run(&self) -> bool {
        self.inner.state().had_changes
    }

    /// Passes finished so far, failed ones included.
    pub fn completed_passes(&self) -> u64 {
        self.inner.state().completed
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("status", &self.status())
            .field("completed_passes", &self.completed_passes())
            .finish()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliveries(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run passes until no rerun is pending.
    async fn drive(self: Arc<Self>) {
        loop {
            let pass_number = {
                let mut state = self.state();
                state.started += 1;
                state.started
            };

            let pass = {
                let inner = Arc::clone(&self);
                self.handle
                    .spawn(async move { inner.run_pass(pass_number).await })
            };
            let outcome = pass.await.unwrap_or_else(|e| {
                Err(MirrorError::PassFailed {
                    message: format!("pass task stopped: {}", e),
                })
            });

            let mut state = self.state();
            state.completed += 1;
            match outcome {
                Ok(report) => {
                    state.had_changes = report.has_changes();
                    state.last_report = Some(report);
                    state.last_error = None;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!("Pass {} failed: {}", pass_number, e);
                    } else {
                        error!("Pass {} failed: {}", pass_number, e);
                    }
                    state.had_changes = false;
                    state.last_error = Some(e.to_string());
                }
            }

            if state.pending {
                state.pending = false;
                self.status.send_replace(RefreshStatus::Running);
                debug!("Starting queued rerun");
                continue;
            }

            state.running = false;
            self.status.send_replace(RefreshStatus::Idle);
            return;
        }
    }

    async fn run_pass(&self, pass_number: u64) -> Result<PassReport> {
        info!("Starting pass {}", pass_number);
        let snapshot = self.snapshots.build().await.map_err(|e| MirrorError::PassFailed {
            message: format!("could not read subscriptions: {}", e),
        })?;

        let reconciler = self.reconciler.clone();
        let report = tokio::task::spawn_blocking(move || reconciler.run(&snapshot, pass_number))
            .await
            .map_err(|e| MirrorError::PassFailed {
                message: format!("reconciliation worker stopped: {}", e),
            })?;

        let delivery =
            self.notifier
                .publish(&self.handle, report.avatars_changed, report.mods_changed);
        if let Some(delivery) = delivery {
            let mut deliveries = self.deliveries();
            deliveries.retain(|d| !d.is_finished());
            deliveries.push(delivery);
        }

        Ok(report)
    }
}
