use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use approval_notify_client::AppError;
use approval_notify_client::admin::{self, AdminError, AdminGate, SettingsForm};
use approval_notify_client::alert::Decision;
use approval_notify_client::app::monitor::{self, MonitorParams};
use approval_notify_client::app::ui::{
    self, AdminRequest, CycleReport, Exit, TrayAction, UiContext, UiEvent, UiHandle, UiOptions,
    UiReceiver, WindowEvent,
};
use approval_notify_client::badge::{DisplayToken, Severity};
use approval_notify_client::config::GeometryConfig;
use approval_notify_client::fetch::ApprovalSource;
use approval_notify_client::geometry::{
    Placement, Point, Rect, ScreenSize, SizeBounds, WheelDirection,
};
use approval_notify_client::platform::{AlertView, Platform};
use approval_notify_client::settings::{Settings, SettingsStore};
use approval_notify_shared::{ApprovalCounts, UserId};
use async_trait::async_trait;
use tokio::sync::oneshot;

const SECRET: &str = "s3cret";
const PAGE: &str = "https://approvals.test/accept/order-request";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Paint(DisplayToken, Rect),
    Hide,
    Alert(AlertView),
    Open(String),
}

#[derive(Default)]
struct FakePlatform {
    calls: Mutex<Vec<Call>>,
    screen: Option<ScreenSize>,
}

impl FakePlatform {
    fn with_screen(width: i32, height: i32) -> Arc<Self> {
        Arc::new(Self {
            screen: Some(ScreenSize { width, height }),
            ..Self::default()
        })
    }

    fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn record(&self, c: Call) {
        self.calls.lock().unwrap().push(c);
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn paint_badge(&self, token: &DisplayToken, rect: Rect) {
        self.record(Call::Paint(token.clone(), rect));
    }
    async fn hide_badge(&self) {
        self.record(Call::Hide);
    }
    async fn show_alert(&self, alert: &AlertView) {
        self.record(Call::Alert(alert.clone()));
    }
    async fn open_url(&self, url: &str) -> Result<(), AppError> {
        self.record(Call::Open(url.to_string()));
        Ok(())
    }
    fn screen_size(&self) -> Option<ScreenSize> {
        self.screen
    }
    fn restart(&self) -> ! {
        panic!("restart is the caller's job");
    }
}

/// Hands out scripted results, then never answers again.
struct ScriptedSource {
    script: Mutex<VecDeque<Option<ApprovalCounts>>>,
}

impl ScriptedSource {
    fn new(script: impl IntoIterator<Item = Option<ApprovalCounts>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
        })
    }
}

#[async_trait]
impl ApprovalSource for ScriptedSource {
    async fn fetch(&self, _user_id: UserId) -> Option<ApprovalCounts> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(r) => r,
            None => std::future::pending().await,
        }
    }
}

struct Harness {
    ctx: UiContext,
    rx: UiReceiver,
    ui: UiHandle,
    platform: Arc<FakePlatform>,
    store: SettingsStore,
    _dir: tempfile::TempDir,
}

fn defaults() -> Settings {
    Settings {
        user_id: UserId(2),
        size: 120,
        x: None,
        y: None,
        refresh_interval: 60,
    }
}

fn options(interval: Duration) -> UiOptions {
    let g = GeometryConfig::default();
    UiOptions {
        approval_page_url: PAGE.into(),
        bounds: SizeBounds::from(g),
        placement: Placement::from_config(&g),
        interval_override: Some(interval),
    }
}

fn harness(source: Arc<dyn ApprovalSource>, interval: Duration) -> Harness {
    harness_on(Arc::new(FakePlatform::default()), source, interval)
}

fn harness_on(
    platform: Arc<FakePlatform>,
    source: Arc<dyn ApprovalSource>,
    interval: Duration,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("approval-notify-setting.json"), defaults());
    let (ui, rx) = ui::channel();
    let digest = admin::digest_hex(SECRET);
    let ctx = UiContext::new(
        options(interval),
        store.clone(),
        platform.clone(),
        source,
        AdminGate::new(Some(&digest)),
        ui.clone(),
    );
    Harness {
        ctx,
        rx,
        ui,
        platform,
        store,
        _dir: dir,
    }
}

impl Harness {
    async fn pump(&mut self) {
        let ev = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("no ui event within 5s")
            .expect("channel closed");
        assert!(self.ctx.handle(ev).await.is_none());
    }

    async fn admin(
        &mut self,
        secret: &str,
        pairs: &[(&str, &str)],
    ) -> Result<Settings, AdminError> {
        let mut form = SettingsForm::default();
        for (k, v) in pairs {
            assert!(form.set(k, *v));
        }
        let (tx, rx) = oneshot::channel();
        let req = AdminRequest {
            secret: secret.into(),
            form,
            reply: tx,
        };
        self.ctx.handle(UiEvent::Admin(req)).await;
        rx.await.unwrap()
    }

    fn file(&self) -> String {
        std::fs::read_to_string(self.store.path()).unwrap()
    }
}

fn anchored() -> Rect {
    // 1920x1080 screen, 40/80 margins, 120px badge
    Rect {
        x: 1760,
        y: 880,
        size: 120,
    }
}

fn token(text: &str, severity: Severity) -> DisplayToken {
    DisplayToken {
        text: text.into(),
        severity,
    }
}

#[tokio::test]
async fn badge_is_painted_before_the_alert_with_the_same_counts() {
    let counts = ApprovalCounts::new(14, 8, 2);
    let mut h = harness(
        ScriptedSource::new([Some(counts), Some(counts)]),
        Duration::from_secs(3600),
    );

    h.ctx.show().await;
    h.pump().await;
    assert_eq!(
        h.platform.take(),
        vec![
            Call::Paint(DisplayToken::placeholder(), anchored()),
            Call::Paint(token("14", Severity::Danger), anchored()),
            Call::Alert(AlertView {
                counts,
                approval_url: format!("{PAGE}?user_id=2"),
            }),
        ]
    );

    // same total again: repaint only
    h.ctx.handle(UiEvent::Tray(TrayAction::CheckNow)).await;
    h.pump().await;
    assert_eq!(
        h.platform.take(),
        vec![Call::Paint(token("14", Severity::Danger), anchored())]
    );
}

#[tokio::test]
async fn no_data_cycles_leave_the_badge_alone() {
    let mut h = harness(
        ScriptedSource::new([None, None, Some(ApprovalCounts::new(0, 0, 0))]),
        Duration::from_millis(10),
    );
    h.ctx.show().await;
    h.pump().await;
    assert_eq!(
        h.platform.take(),
        vec![
            Call::Paint(DisplayToken::placeholder(), anchored()),
            Call::Paint(token("0", Severity::Neutral), anchored()),
        ]
    );
}

#[tokio::test]
async fn drags_do_not_touch_the_file_until_close() {
    let mut h = harness(ScriptedSource::new([]), Duration::from_secs(3600));
    h.ctx.show().await;
    let before = h.file();

    for ev in [
        WindowEvent::Press(Point::new(10, 10)),
        WindowEvent::Motion(Point::new(310, 210)),
        WindowEvent::Motion(Point::new(510, 410)),
        WindowEvent::Release,
        WindowEvent::Wheel {
            modifier_held: true,
            direction: WheelDirection::Up,
        },
        WindowEvent::Wheel {
            modifier_held: false,
            direction: WheelDirection::Up,
        },
    ] {
        assert!(h.ctx.handle(UiEvent::Window(ev)).await.is_none());
    }
    assert_eq!(h.file(), before);
    let moved = Rect {
        x: 500,
        y: 400,
        size: 130,
    };
    assert_eq!(h.ctx.snapshot().badge.unwrap().rect, moved);

    // motion after release does nothing
    h.ctx
        .handle(UiEvent::Window(WindowEvent::Motion(Point::new(0, 0))))
        .await;
    assert_eq!(h.ctx.snapshot().badge.unwrap().rect, moved);

    h.ctx.handle(UiEvent::Window(WindowEvent::Close)).await;
    assert_eq!(h.platform.take().last(), Some(&Call::Hide));
    assert!(h.ctx.snapshot().badge.is_none());
    assert_eq!(
        h.store.load(),
        Settings {
            x: Some(500),
            y: Some(400),
            size: 130,
            ..defaults()
        }
    );
}

#[tokio::test]
async fn reshow_uses_the_saved_position() {
    let mut h = harness(ScriptedSource::new([]), Duration::from_secs(3600));
    h.ctx.show().await;
    h.ctx
        .handle(UiEvent::Window(WindowEvent::Press(Point::new(0, 0))))
        .await;
    h.ctx
        .handle(UiEvent::Window(WindowEvent::Motion(Point::new(0, 0))))
        .await;
    h.ctx.handle(UiEvent::Window(WindowEvent::Close)).await;
    h.platform.take();

    h.ctx.handle(UiEvent::Tray(TrayAction::Show)).await;
    assert_eq!(
        h.platform.take(),
        vec![Call::Paint(
            DisplayToken::placeholder(),
            Rect {
                x: 0,
                y: 0,
                size: 120
            }
        )]
    );
}

#[tokio::test]
async fn stale_session_cycles_are_dropped() {
    let mut h = harness(ScriptedSource::new([]), Duration::from_secs(3600));
    h.ctx.show().await;
    let first = h.ctx.snapshot().badge.unwrap().session;
    h.ctx.handle(UiEvent::Window(WindowEvent::Close)).await;

    let report = |session| CycleReport {
        session,
        counts: ApprovalCounts::new(3, 0, 1),
        decision: Decision::Fire,
    };

    // badge closed: nothing to paint
    h.ctx.handle(UiEvent::Cycle(report(first))).await;
    h.platform.take();

    h.ctx.show().await;
    let second = h.ctx.snapshot().badge.unwrap().session;
    assert_ne!(first, second);
    h.platform.take();

    h.ctx.handle(UiEvent::Cycle(report(first))).await;
    assert!(h.platform.take().is_empty());

    h.ctx.handle(UiEvent::Cycle(report(second))).await;
    let calls = h.platform.take();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], Call::Paint(t, _) if *t == token("3", Severity::Alert)));
    assert!(matches!(&calls[1], Call::Alert(_)));
}

#[tokio::test]
async fn double_click_opens_the_page_for_the_watched_user() {
    let mut h = harness(ScriptedSource::new([]), Duration::from_secs(3600));
    h.ctx.show().await;
    h.platform.take();
    h.ctx
        .handle(UiEvent::Window(WindowEvent::DoubleClick))
        .await;
    assert_eq!(
        h.platform.take(),
        vec![Call::Open(format!("{PAGE}?user_id=2"))]
    );
}

#[tokio::test]
async fn admin_rejections_leave_the_file_untouched() {
    let mut h = harness(ScriptedSource::new([]), Duration::from_secs(3600));
    h.ctx.show().await;
    let before = h.file();

    let err = h.admin("wrong", &[("user_id", "5")]).await.unwrap_err();
    assert!(matches!(err, AdminError::Auth));

    let err = h.admin(SECRET, &[("user_id", "5"), ("size", "9999")]).await.unwrap_err();
    assert!(matches!(err, AdminError::Validation(_)), "got {err:?}");

    let err = h.admin(SECRET, &[("refresh_interval", "soon")]).await.unwrap_err();
    assert!(matches!(err, AdminError::Validation(_)), "got {err:?}");

    assert_eq!(h.file(), before);
    assert_eq!(h.ctx.snapshot().settings, defaults());
}

#[tokio::test]
async fn admin_save_applies_placement_at_once() {
    let mut h = harness(ScriptedSource::new([]), Duration::from_secs(3600));
    h.ctx.show().await;
    h.platform.take();

    let saved = h
        .admin(SECRET, &[("user_id", "5"), ("x", "100"), ("y", "200"), ("size", "150")])
        .await
        .unwrap();
    let expected = Settings {
        user_id: UserId(5),
        size: 150,
        x: Some(100),
        y: Some(200),
        refresh_interval: 60,
    };
    assert_eq!(saved, expected);
    assert_eq!(h.store.load(), expected);

    let snap = h.ctx.snapshot();
    let badge = snap.badge.unwrap();
    assert_eq!(
        badge.rect,
        Rect {
            x: 100,
            y: 200,
            size: 150
        }
    );
    // the running session keeps watching the old user
    assert_eq!(badge.user_id, UserId(2));

    // closing right away writes the admin's placement, not the old one
    h.ctx.handle(UiEvent::Window(WindowEvent::Close)).await;
    assert_eq!(h.store.load(), expected);
}

#[tokio::test]
async fn admin_save_keeps_an_unsaved_drag() {
    let mut h = harness(ScriptedSource::new([]), Duration::from_secs(3600));
    h.ctx.show().await;
    for ev in [
        WindowEvent::Press(Point::new(10, 10)),
        WindowEvent::Motion(Point::new(510, 410)),
        WindowEvent::Release,
    ] {
        h.ctx.handle(UiEvent::Window(ev)).await;
    }
    let dragged = Rect {
        x: 500,
        y: 400,
        size: 120,
    };

    h.admin(SECRET, &[("refresh_interval", "30")]).await.unwrap();
    assert_eq!(h.ctx.snapshot().badge.unwrap().rect, dragged);
    // the drag itself is still only in memory
    let saved = h.store.load();
    assert_eq!(saved.x, None);
    assert_eq!(saved.refresh_interval, 30);

    h.ctx.handle(UiEvent::Window(WindowEvent::Close)).await;
    assert_eq!(
        h.store.load(),
        Settings {
            x: Some(500),
            y: Some(400),
            size: 120,
            refresh_interval: 30,
            ..defaults()
        }
    );
}

#[tokio::test]
async fn badge_anchors_to_the_reported_screen() {
    let mut h = harness_on(
        FakePlatform::with_screen(2560, 1440),
        ScriptedSource::new([]),
        Duration::from_secs(3600),
    );
    h.ctx.show().await;
    // 40/80 margins from the bottom-right of 2560x1440
    assert_eq!(
        h.platform.take(),
        vec![Call::Paint(
            DisplayToken::placeholder(),
            Rect {
                x: 2400,
                y: 1240,
                size: 120
            }
        )]
    );

    // a stored position still wins over the anchor
    h.ctx.handle(UiEvent::Window(WindowEvent::Close)).await;
    h.admin(SECRET, &[("x", "30"), ("y", "40")]).await.unwrap();
    h.platform.take();
    h.ctx.show().await;
    assert_eq!(
        h.platform.take(),
        vec![Call::Paint(
            DisplayToken::placeholder(),
            Rect {
                x: 30,
                y: 40,
                size: 120
            }
        )]
    );
}

#[tokio::test]
async fn unknown_screen_falls_back_to_the_configured_size() {
    let mut h = harness(ScriptedSource::new([]), Duration::from_secs(3600));
    h.ctx.show().await;
    assert_eq!(
        h.platform.take(),
        vec![Call::Paint(DisplayToken::placeholder(), anchored())]
    );
}

#[tokio::test]
async fn quit_and_restart_end_the_loop() {
    for (action, exit) in [(TrayAction::Quit, Exit::Quit), (TrayAction::Restart, Exit::Restart)] {
        let h = harness(ScriptedSource::new([]), Duration::from_secs(3600));
        assert!(h.ui.post(UiEvent::Tray(action)));
        let got = tokio::time::timeout(Duration::from_secs(5), h.ctx.run(h.rx))
            .await
            .expect("ui loop did not stop");
        assert_eq!(got, exit);
        // shown first, and quitting does not persist geometry
        assert_eq!(
            h.platform.take(),
            vec![Call::Paint(DisplayToken::placeholder(), anchored())]
        );
        assert_eq!(h.store.load(), defaults());
    }
}

/// Counts how many fetches overlap.
struct SlowSource {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl ApprovalSource for SlowSource {
    async fn fetch(&self, _user_id: UserId) -> Option<ApprovalCounts> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as u32;
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Some(ApprovalCounts::new(n + 1, 0, 0))
    }
}

#[tokio::test(start_paused = true)]
async fn monitor_never_overlaps_fetches() {
    let source = Arc::new(SlowSource {
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
        calls: AtomicUsize::new(0),
    });
    let (ui, mut rx) = ui::channel();
    let handle = monitor::spawn(
        MonitorParams {
            session: 7,
            user_id: UserId(2),
            interval: Duration::from_millis(10),
        },
        source.clone(),
        ui,
    );

    let mut decisions = Vec::new();
    for _ in 0..5 {
        handle.check_now();
        handle.check_now();
        let Some(UiEvent::Cycle(report)) = rx.recv().await else {
            panic!("expected a cycle report");
        };
        assert_eq!(report.session, 7);
        decisions.push(report.decision);
    }
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    // totals 1..=5 keep rising, so every cycle fires
    assert!(decisions.iter().all(|d| *d == Decision::Fire));

    handle.abort();
}

#[tokio::test]
async fn check_now_cuts_the_wait_short() {
    let counts = ApprovalCounts::new(1, 0, 0);
    let source = ScriptedSource::new([Some(counts), Some(counts)]);
    let (ui, mut rx) = ui::channel();
    let handle = monitor::spawn(
        MonitorParams {
            session: 1,
            user_id: UserId(2),
            interval: Duration::from_secs(3600),
        },
        source,
        ui,
    );

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
    assert!(matches!(first, Ok(Some(UiEvent::Cycle(_)))));

    handle.check_now();
    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("check now did not trigger a fetch");
    let Some(UiEvent::Cycle(report)) = second else {
        panic!("expected a cycle report");
    };
    assert_eq!(report.decision, Decision::Hold);

    handle.abort();
}
