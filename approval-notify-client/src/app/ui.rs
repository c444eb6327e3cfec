//! The UI-owning context.
//!
//! Everything mutable that the user can see or that ends up on disk lives
//! here: settings, badge geometry, the current display token and the
//! monitoring session. Other tasks reach it only by posting a [`UiEvent`]
//! through a [`UiHandle`]; events are handled one at a time, in order.

use std::sync::Arc;
use std::time::Duration;

use approval_notify_shared::api::endpoints;
use approval_notify_shared::{ApprovalCounts, UserId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::admin::{AdminError, AdminGate, SettingsForm};
use crate::alert::Decision;
use crate::app::monitor::{self, MonitorHandle, MonitorParams};
use crate::badge::{self, DisplayToken};
use crate::config::ClientConfig;
use crate::fetch::ApprovalSource;
use crate::geometry::{GeometryController, Placement, Point, Rect, SizeBounds, WheelDirection};
use crate::platform::{AlertView, Platform};
use crate::settings::{Settings, SettingsStore};

/// One successful fetch cycle: the counts and what the state machine made of
/// them. Badge and alert for the cycle are both driven from this snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub session: u64,
    pub counts: ApprovalCounts,
    pub decision: Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    /// Start monitoring if the badge was closed; otherwise repaint it.
    Show,
    CheckNow,
    Restart,
    Quit,
}

/// Pointer and window-manager input on the badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// Button pressed at this offset inside the badge.
    Press(Point),
    /// Pointer moved to this screen position with the button held.
    Motion(Point),
    Release,
    Wheel {
        modifier_held: bool,
        direction: WheelDirection,
    },
    DoubleClick,
    Close,
}

pub struct AdminRequest {
    pub secret: String,
    pub form: SettingsForm,
    pub reply: oneshot::Sender<Result<Settings, AdminError>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiSnapshot {
    pub settings: Settings,
    pub badge: Option<BadgeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeSnapshot {
    pub session: u64,
    pub user_id: UserId,
    pub rect: Rect,
    pub token: DisplayToken,
}

pub enum UiEvent {
    Cycle(CycleReport),
    Window(WindowEvent),
    Tray(TrayAction),
    Admin(AdminRequest),
    Snapshot(oneshot::Sender<UiSnapshot>),
}

/// Why the UI context stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Restart,
}

/// Cloneable, thread-safe way to run something on the UI context.
#[derive(Clone, Debug)]
pub struct UiHandle {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiHandle {
    /// Queue `event` for the UI context. Returns `false` once the context is
    /// gone.
    pub fn post(&self, event: UiEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

pub type UiReceiver = mpsc::UnboundedReceiver<UiEvent>;

pub fn channel() -> (UiHandle, UiReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiHandle { tx }, rx)
}

#[derive(Debug, Clone)]
pub struct UiOptions {
    pub approval_page_url: String,
    pub bounds: SizeBounds,
    pub placement: Placement,
    /// Replaces the settings' refresh interval (debug mode).
    pub interval_override: Option<Duration>,
}

impl UiOptions {
    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self {
            approval_page_url: cfg.approval_page_url.clone(),
            bounds: SizeBounds::from(cfg.geometry),
            placement: Placement::from_config(&cfg.geometry),
            interval_override: cfg
                .debug
                .enabled
                .then(|| Duration::from_secs(cfg.debug.refresh_interval_secs.max(1))),
        }
    }
}

struct Badge {
    user_id: UserId,
    geometry: GeometryController,
    token: DisplayToken,
    monitor: MonitorHandle,
}

pub struct UiContext {
    opts: UiOptions,
    store: SettingsStore,
    settings: Settings,
    platform: Arc<dyn Platform>,
    source: Arc<dyn ApprovalSource>,
    admin: AdminGate,
    ui: UiHandle,
    badge: Option<Badge>,
    next_session: u64,
}

impl UiContext {
    pub fn new(
        opts: UiOptions,
        store: SettingsStore,
        platform: Arc<dyn Platform>,
        source: Arc<dyn ApprovalSource>,
        admin: AdminGate,
        ui: UiHandle,
    ) -> Self {
        let settings = store.defaults().clone();
        Self {
            opts,
            store,
            settings,
            platform,
            source,
            admin,
            ui,
            badge: None,
            next_session: 1,
        }
    }

    /// Show the badge, then handle events until quit or restart.
    pub async fn run(mut self, mut rx: UiReceiver) -> Exit {
        self.show().await;
        while let Some(event) = rx.recv().await {
            if let Some(exit) = self.handle(event).await {
                self.teardown();
                return exit;
            }
        }
        self.teardown();
        Exit::Quit
    }

    pub async fn handle(&mut self, event: UiEvent) -> Option<Exit> {
        match event {
            UiEvent::Cycle(report) => self.on_cycle(report).await,
            UiEvent::Window(ev) => self.on_window(ev).await,
            UiEvent::Tray(action) => return self.on_tray(action).await,
            UiEvent::Admin(req) => self.on_admin(req).await,
            UiEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
        None
    }

    pub fn snapshot(&self) -> UiSnapshot {
        UiSnapshot {
            settings: self.settings.clone(),
            badge: self.badge.as_ref().map(|b| BadgeSnapshot {
                session: b.monitor.session(),
                user_id: b.user_id,
                rect: b.geometry.rect(),
                token: b.token.clone(),
            }),
        }
    }

    /// Load settings, place the badge and start a fresh monitoring session.
    /// A badge that is already up is only repainted.
    pub async fn show(&mut self) {
        if self.badge.is_some() {
            self.repaint().await;
            return;
        }
        self.settings = self.store.load();
        let geometry =
            GeometryController::from_settings(&self.settings, self.opts.bounds, &self.placement());
        let session = self.next_session;
        self.next_session += 1;
        let interval = self
            .opts
            .interval_override
            .unwrap_or_else(|| Duration::from_secs(self.settings.refresh_interval.max(1)));
        let monitor = monitor::spawn(
            MonitorParams {
                session,
                user_id: self.settings.user_id,
                interval,
            },
            self.source.clone(),
            self.ui.clone(),
        );
        self.badge = Some(Badge {
            user_id: self.settings.user_id,
            geometry,
            token: DisplayToken::placeholder(),
            monitor,
        });
        self.repaint().await;
    }

    /// Anchoring for badges without a stored position: the screen the
    /// platform reports, else the configured fallback size.
    fn placement(&self) -> Placement {
        match self.platform.screen_size() {
            Some(screen) => Placement {
                screen,
                ..self.opts.placement
            },
            None => {
                debug!("screen size unknown; anchoring to the configured size");
                self.opts.placement
            }
        }
    }

    async fn repaint(&self) {
        if let Some(b) = &self.badge {
            self.platform.paint_badge(&b.token, b.geometry.rect()).await;
        }
    }

    async fn on_cycle(&mut self, report: CycleReport) {
        let Some(b) = self.badge.as_mut() else {
            debug!(session = report.session, "cycle after badge closed; ignoring");
            return;
        };
        if b.monitor.session() != report.session {
            debug!(
                session = report.session,
                current = b.monitor.session(),
                "cycle from stale session; ignoring"
            );
            return;
        }
        b.token = badge::present(&report.counts);
        let user_id = b.user_id;
        self.repaint().await;
        if report.decision.fires() {
            let view = AlertView {
                counts: report.counts,
                approval_url: approval_url(&self.opts, user_id),
            };
            self.platform.show_alert(&view).await;
        }
    }

    async fn on_window(&mut self, ev: WindowEvent) {
        if ev == WindowEvent::Close {
            self.close().await;
            return;
        }
        let Some(b) = self.badge.as_mut() else {
            debug!(?ev, "window event without badge; ignoring");
            return;
        };
        let changed = match ev {
            WindowEvent::Press(offset) => {
                b.geometry.begin_drag(offset);
                false
            }
            WindowEvent::Motion(pointer) => b.geometry.continue_drag(pointer).is_some(),
            WindowEvent::Release => {
                b.geometry.end_drag();
                false
            }
            WindowEvent::Wheel {
                modifier_held,
                direction,
            } => b.geometry.resize(modifier_held, direction).is_some(),
            WindowEvent::DoubleClick => {
                let url = approval_url(&self.opts, b.user_id);
                if let Err(e) = self.platform.open_url(&url).await {
                    warn!(error=%e, "could not open approval page");
                }
                false
            }
            WindowEvent::Close => false,
        };
        if changed {
            self.repaint().await;
        }
    }

    /// Persist the final geometry, stop monitoring and take the badge down.
    async fn close(&mut self) {
        let Some(mut b) = self.badge.take() else {
            debug!("close without badge; ignoring");
            return;
        };
        let rect = b.geometry.close(&mut self.settings);
        if let Err(e) = self.store.save(&self.settings) {
            warn!(error=%e, "could not persist badge geometry; keeping it in memory");
        }
        b.monitor.abort();
        self.platform.hide_badge().await;
        info!(x = rect.x, y = rect.y, size = rect.size, "badge closed");
    }

    async fn on_tray(&mut self, action: TrayAction) -> Option<Exit> {
        match action {
            TrayAction::Show => self.show().await,
            TrayAction::CheckNow => match &self.badge {
                Some(b) => b.monitor.check_now(),
                None => debug!("check requested while badge closed; ignoring"),
            },
            TrayAction::Restart => {
                info!("restart requested");
                return Some(Exit::Restart);
            }
            TrayAction::Quit => {
                info!("quit requested");
                return Some(Exit::Quit);
            }
        }
        None
    }

    async fn on_admin(&mut self, req: AdminRequest) {
        let AdminRequest {
            secret,
            form,
            reply,
        } = req;
        let res = self
            .admin
            .unlock(&secret)
            .and_then(|session| session.save(&form, &self.settings, self.opts.bounds, &self.store));
        if let Ok(saved) = &res {
            self.settings = saved.clone();
            let placement = self.placement();
            if let Some(b) = self.badge.as_mut() {
                // Geometry fields the form set apply right away; the rest stay
                // where the user left them. User and interval changes wait for
                // the next session.
                let live = b.geometry.rect();
                let mut placed = saved.clone();
                if form.x.is_none() {
                    placed.x = Some(live.x);
                }
                if form.y.is_none() {
                    placed.y = Some(live.y);
                }
                if form.size.is_none() {
                    placed.size = live.size;
                }
                b.geometry =
                    GeometryController::from_settings(&placed, self.opts.bounds, &placement);
            }
            self.repaint().await;
        }
        if let Err(e) = &res {
            warn!(error=%e, "admin save rejected");
        }
        let _ = reply.send(res);
    }

    /// Quit/restart path: the monitor is dropped mid-flight and geometry is
    /// not persisted.
    fn teardown(&mut self) {
        if let Some(b) = self.badge.take() {
            b.monitor.abort();
        }
    }
}

fn approval_url(opts: &UiOptions, user_id: UserId) -> String {
    endpoints::approval_page(&opts.approval_page_url, user_id)
}
