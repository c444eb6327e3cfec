//! Background fetch loop.
//!
//! One task per monitoring session. It owns the [`NotificationState`], runs
//! one fetch at a time, and hands every successful result to the UI context
//! together with that cycle's alert decision. It never touches settings,
//! geometry or the screen.

use std::sync::Arc;
use std::time::Duration;

use approval_notify_shared::UserId;
use tokio::sync::Notify;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::alert::NotificationState;
use crate::app::ui::{CycleReport, UiEvent, UiHandle};
use crate::fetch::ApprovalSource;

#[derive(Debug, Clone, Copy)]
pub struct MonitorParams {
    pub session: u64,
    pub user_id: UserId,
    /// Pause between the end of one fetch and the start of the next.
    pub interval: Duration,
}

pub struct MonitorHandle {
    session: u64,
    check_now: Arc<Notify>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl MonitorHandle {
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Cut the current wait short. A request made while a fetch is in flight
    /// starts the next fetch as soon as that one finishes.
    pub fn check_now(&self) {
        self.check_now.notify_one();
    }

    /// Stop the loop without waiting for an in-flight fetch.
    pub fn abort(self) {
        self.cancel.cancel();
        self.task.abort();
        debug!(session = self.session, "monitor aborted");
    }
}

pub fn spawn(
    params: MonitorParams,
    source: Arc<dyn ApprovalSource>,
    ui: UiHandle,
) -> MonitorHandle {
    let check_now = Arc::new(Notify::new());
    let cancel = CancellationToken::new();
    let task = tokio::spawn(monitor_loop(
        params,
        source,
        ui,
        check_now.clone(),
        cancel.child_token(),
    ));
    info!(
        session = params.session,
        user_id = %params.user_id,
        interval_secs = params.interval.as_secs_f64(),
        "monitor started"
    );
    MonitorHandle {
        session: params.session,
        check_now,
        cancel,
        task,
    }
}

async fn monitor_loop(
    params: MonitorParams,
    source: Arc<dyn ApprovalSource>,
    ui: UiHandle,
    check_now: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut state = NotificationState::new();

    loop {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => break,
            f = source.fetch(params.user_id) => f,
        };

        let decision = state.observe(fetched.as_ref());
        match fetched {
            Some(counts) => {
                info!(
                    session = params.session,
                    total = counts.total,
                    danger = counts.danger,
                    alert = counts.alert,
                    fire = decision.fires(),
                    phase = ?state.phase(),
                    "cycle complete"
                );
                let report = CycleReport {
                    session: params.session,
                    counts,
                    decision,
                };
                if !ui.post(UiEvent::Cycle(report)) {
                    info!(session = params.session, "ui context gone; monitor exiting");
                    break;
                }
            }
            None => {
                debug!(session = params.session, "cycle produced no data; retrying next tick");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = check_now.notified() => {
                debug!(session = params.session, "check requested");
            }
            _ = sleep(params.interval) => {}
        }
    }
    debug!(session = params.session, "monitor loop finished");
}
