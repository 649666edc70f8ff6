//! Poll Synchronizer: one refresh loop per mounted view.
//!
//! Each tick fetches the view's whole collection and replaces the previous
//! snapshot. A failed tick keeps the old alerts and records the error; the
//! next tick retries. Dropping the [`PollHandle`] cancels the loop.

use chrono::{DateTime, Utc};
use common::lifecycle::is_reachable;
use common::{Alert, AlertStatus};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alerts::AlertRepository;
use crate::error::{ClientError, ClientResult};

/// Which collection a view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Everyone's alerts, optionally with one status
    Public(Option<AlertStatus>),
    /// The signed-in identity's own reports
    Own,
    /// Every alert, for administrators
    Admin,
}

impl View {
    fn name(&self) -> &'static str {
        match self {
            View::Public(_) => "public",
            View::Own => "own",
            View::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Fetch on mount, then every period
    Every(Duration),
    /// Fetch on mount and on [`PollHandle::refresh`] only
    OnDemand,
}

/// What a view renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub alerts: Vec<Alert>,
    /// Error of the latest tick, cleared by the next successful one
    pub last_error: Option<ClientError>,
    pub last_success: Option<DateTime<Utc>>,
    /// Completed ticks, successful or not
    pub ticks: u64,
    /// Alerts whose status in the latest snapshot cannot follow the one
    /// previously shown, which points at a stale response
    pub regressed: Vec<Uuid>,
}

impl ViewState {
    /// Adopt `next` as the whole collection
    fn apply(&mut self, next: Vec<Alert>) {
        let previous: HashMap<Uuid, AlertStatus> =
            self.alerts.iter().map(|a| (a.id, a.status)).collect();

        self.regressed = next
            .iter()
            .filter(|alert| {
                previous
                    .get(&alert.id)
                    .is_some_and(|before| !is_reachable(*before, alert.status))
            })
            .map(|alert| alert.id)
            .collect();

        self.alerts = next;
        self.last_error = None;
        self.last_success = Some(Utc::now());
        self.ticks += 1;
    }

    fn fail(&mut self, error: ClientError) {
        self.last_error = Some(error);
        self.ticks += 1;
    }
}

/// Mounts views against one repository
#[derive(Clone)]
pub struct PollSynchronizer {
    repository: AlertRepository,
}

impl PollSynchronizer {
    pub fn new(repository: AlertRepository) -> Self {
        Self { repository }
    }

    /// Start refreshing `view` with `policy`. The first fetch happens
    /// immediately. A zero period falls back to [`RefreshPolicy::OnDemand`].
    pub fn mount(&self, view: View, policy: RefreshPolicy) -> PollHandle {
        let policy = match policy {
            RefreshPolicy::Every(period) if period.is_zero() => {
                warn!(view = view.name(), "Zero refresh period, refreshing on demand");
                RefreshPolicy::OnDemand
            }
            policy => policy,
        };
        let (state_tx, state_rx) = watch::channel(ViewState::default());
        let (refresh_tx, refresh_rx) = mpsc::channel(1);

        let repository = self.repository.clone();
        let task = tokio::spawn(run(repository, view, policy, state_tx, refresh_rx));

        info!(view = view.name(), ?policy, "View mounted");
        PollHandle {
            view,
            state: state_rx,
            refresh: refresh_tx,
            task,
        }
    }
}

async fn fetch(repository: &AlertRepository, view: View) -> ClientResult<Vec<Alert>> {
    match view {
        View::Public(status) => repository.list_public(status).await,
        View::Own => repository.list_own().await,
        View::Admin => repository.list_all().await,
    }
}

async fn tick(repository: &AlertRepository, view: View, state: &watch::Sender<ViewState>) {
    match fetch(repository, view).await {
        Ok(alerts) => {
            debug!(view = view.name(), count = alerts.len(), "Tick");
            state.send_modify(|s| {
                s.apply(alerts);
                if !s.regressed.is_empty() {
                    warn!(
                        view = view.name(),
                        regressed = s.regressed.len(),
                        "Snapshot moved alerts backwards"
                    );
                }
            });
        }
        Err(e) => {
            warn!(view = view.name(), "Refresh failed: {}", e);
            state.send_modify(|s| s.fail(e));
        }
    }
}

async fn run(
    repository: AlertRepository,
    view: View,
    policy: RefreshPolicy,
    state: watch::Sender<ViewState>,
    mut refresh: mpsc::Receiver<()>,
) {
    match policy {
        RefreshPolicy::Every(period) => {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    request = refresh.recv() => {
                        if request.is_none() {
                            break;
                        }
                    }
                }
                tick(&repository, view, &state).await;
            }
        }
        RefreshPolicy::OnDemand => {
            tick(&repository, view, &state).await;
            while refresh.recv().await.is_some() {
                tick(&repository, view, &state).await;
            }
        }
    }

    debug!(view = view.name(), "Refresh loop stopped");
}

/// A mounted view. Dropping it stops the refresh loop.
pub struct PollHandle {
    view: View,
    state: watch::Receiver<ViewState>,
    refresh: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn view(&self) -> View {
        self.view
    }

    /// Latest published state
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    /// Request an out-of-cycle fetch. Requests made while one is already
    /// queued are merged into it.
    pub fn refresh(&self) {
        if self.refresh.try_send(()).is_err() {
            debug!(view = self.view.name(), "Refresh already queued");
        }
    }

    /// Wait until at least `ticks` ticks have completed
    pub async fn wait_for_ticks(&self, ticks: u64) -> ViewState {
        let mut rx = self.state.clone();
        match rx.wait_for(|s| s.ticks >= ticks).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Tear the view down
    pub fn stop(self) {}

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
        debug!(view = self.view.name(), "View unmounted");
    }
}
