//! Line-oriented control surface on stdin.
//!
//! Stands in for the tray menu and pointer input: each line becomes one
//! [`UiEvent`]. When stdin closes (started from a desktop autostart entry,
//! for instance) the surface stops reading and the agent keeps running.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::admin::SettingsForm;
use crate::app::ui::{AdminRequest, TrayAction, UiEvent, UiHandle, UiSnapshot, WindowEvent};
use crate::geometry::{Point, WheelDirection};

pub const HELP: &str = "\
commands:
  show                 start monitoring / bring the badge back
  check                fetch now
  open                 open the approval page
  close                close the badge (saves position and size)
  restart | quit
  grab DX DY           press inside the badge at offset DX,DY
  move X Y             drag the grabbed badge to screen position X,Y
  release              end the drag
  wheel up|down [ctrl] wheel over the badge; resizes only with ctrl
  admin KEY=VALUE...   edit settings (keys: user_id size x y refresh_interval)
  status               print current settings and badge state";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Tray(TrayAction),
    Window(WindowEvent),
    Admin(SettingsForm),
    Status,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command {0:?}; type `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown settings key {0:?}")]
    UnknownKey(String),
}

pub fn parse_command(line: &str) -> Result<Option<ControlCommand>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let parsed = match (cmd.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("show" | "run", []) => ControlCommand::Tray(TrayAction::Show),
        ("check", []) => ControlCommand::Tray(TrayAction::CheckNow),
        ("restart", []) => ControlCommand::Tray(TrayAction::Restart),
        ("quit" | "exit", []) => ControlCommand::Tray(TrayAction::Quit),
        ("open", []) => ControlCommand::Window(WindowEvent::DoubleClick),
        ("close", []) => ControlCommand::Window(WindowEvent::Close),
        ("release", []) => ControlCommand::Window(WindowEvent::Release),
        ("grab", [dx, dy]) => {
            ControlCommand::Window(WindowEvent::Press(point(dx, dy, "grab DX DY")?))
        }
        ("grab", _) => return Err(ParseError::Usage("grab DX DY")),
        ("move", [x, y]) => ControlCommand::Window(WindowEvent::Motion(point(x, y, "move X Y")?)),
        ("move", _) => return Err(ParseError::Usage("move X Y")),
        ("wheel", [dir, mods @ ..]) if mods.len() <= 1 => {
            let direction = match dir.to_ascii_lowercase().as_str() {
                "up" => WheelDirection::Up,
                "down" => WheelDirection::Down,
                _ => return Err(ParseError::Usage("wheel up|down [ctrl]")),
            };
            let modifier_held = match mods {
                [] => false,
                [m] if m.eq_ignore_ascii_case("ctrl") => true,
                _ => return Err(ParseError::Usage("wheel up|down [ctrl]")),
            };
            ControlCommand::Window(WindowEvent::Wheel {
                modifier_held,
                direction,
            })
        }
        ("wheel", _) => return Err(ParseError::Usage("wheel up|down [ctrl]")),
        ("admin", pairs) => ControlCommand::Admin(parse_form(pairs)?),
        ("status", []) => ControlCommand::Status,
        ("help" | "?", _) => ControlCommand::Help,
        _ => return Err(ParseError::Unknown(line.trim().to_string())),
    };
    Ok(Some(parsed))
}

fn point(x: &str, y: &str, usage: &'static str) -> Result<Point, ParseError> {
    match (x.parse(), y.parse()) {
        (Ok(x), Ok(y)) => Ok(Point::new(x, y)),
        _ => Err(ParseError::Usage(usage)),
    }
}

fn parse_form(pairs: &[&str]) -> Result<SettingsForm, ParseError> {
    if pairs.is_empty() {
        return Err(ParseError::Usage("admin KEY=VALUE..."));
    }
    let mut form = SettingsForm::default();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ParseError::Usage("admin KEY=VALUE..."));
        };
        if !form.set(key, value) {
            return Err(ParseError::UnknownKey(key.to_string()));
        }
    }
    Ok(form)
}

/// Read commands from `reader` until it closes, posting them to the UI
/// context.
pub async fn run<R>(reader: R, ui: UiHandle)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => {
                debug!("control input closed; no more commands will be read");
                return;
            }
            Err(e) => {
                warn!(error=%e, "control input failed; no more commands will be read");
                return;
            }
        };
        let cmd = match parse_command(&line) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        let delivered = match cmd {
            ControlCommand::Tray(action) => ui.post(UiEvent::Tray(action)),
            ControlCommand::Window(ev) => ui.post(UiEvent::Window(ev)),
            ControlCommand::Help => {
                println!("{HELP}");
                true
            }
            ControlCommand::Status => print_status(&ui).await,
            ControlCommand::Admin(form) => submit_admin(&ui, form).await,
        };
        if !delivered {
            info!("ui context gone; control surface exiting");
            return;
        }
    }
}

async fn print_status(ui: &UiHandle) -> bool {
    let (tx, rx) = oneshot::channel();
    if !ui.post(UiEvent::Snapshot(tx)) {
        return false;
    }
    match rx.await {
        Ok(snapshot) => {
            println!("{}", describe(&snapshot));
            true
        }
        Err(_) => false,
    }
}

fn describe(s: &UiSnapshot) -> String {
    let settings = format!(
        "user_id={} size={} x={} y={} refresh_interval={}s",
        s.settings.user_id,
        s.settings.size,
        s.settings.x.map_or("-".into(), |v| v.to_string()),
        s.settings.y.map_or("-".into(), |v| v.to_string()),
        s.settings.refresh_interval,
    );
    match &s.badge {
        Some(b) => format!(
            "{settings}\nbadge: {} ({}) at {},{} size {} [session {}]",
            b.token.text, b.token.severity, b.rect.x, b.rect.y, b.rect.size, b.session
        ),
        None => format!("{settings}\nbadge: closed"),
    }
}

async fn submit_admin(ui: &UiHandle, form: SettingsForm) -> bool {
    let prompt =
        tokio::task::spawn_blocking(|| rpassword::prompt_password("管理者パスワード: "));
    let secret = match prompt.await {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => {
            warn!(error=%e, "could not read admin password");
            return true;
        }
        Err(e) => {
            warn!(error=%e, "password prompt task failed");
            return true;
        }
    };
    let (tx, rx) = oneshot::channel();
    let req = AdminRequest {
        secret,
        form,
        reply: tx,
    };
    if !ui.post(UiEvent::Admin(req)) {
        return false;
    }
    match rx.await {
        Ok(Ok(saved)) => {
            println!("設定を保存しました: {saved:?}");
            true
        }
        Ok(Err(e)) => {
            println!("エラー: {e}");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(line: &str) -> ControlCommand {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn tray_actions() {
        assert_eq!(ok("show"), ControlCommand::Tray(TrayAction::Show));
        assert_eq!(ok("  CHECK "), ControlCommand::Tray(TrayAction::CheckNow));
        assert_eq!(ok("restart"), ControlCommand::Tray(TrayAction::Restart));
        assert_eq!(ok("exit"), ControlCommand::Tray(TrayAction::Quit));
    }

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn pointer_commands() {
        assert_eq!(
            ok("grab 10 -4"),
            ControlCommand::Window(WindowEvent::Press(Point::new(10, -4)))
        );
        assert_eq!(
            ok("move 300 200"),
            ControlCommand::Window(WindowEvent::Motion(Point::new(300, 200)))
        );
        assert_eq!(ok("release"), ControlCommand::Window(WindowEvent::Release));
        assert_eq!(ok("open"), ControlCommand::Window(WindowEvent::DoubleClick));
        assert_eq!(ok("close"), ControlCommand::Window(WindowEvent::Close));
        assert_eq!(parse_command("move 1"), Err(ParseError::Usage("move X Y")));
        assert_eq!(parse_command("grab a b"), Err(ParseError::Usage("grab DX DY")));
    }

    #[test]
    fn wheel_with_and_without_modifier() {
        assert_eq!(
            ok("wheel up ctrl"),
            ControlCommand::Window(WindowEvent::Wheel {
                modifier_held: true,
                direction: WheelDirection::Up
            })
        );
        assert_eq!(
            ok("wheel down"),
            ControlCommand::Window(WindowEvent::Wheel {
                modifier_held: false,
                direction: WheelDirection::Down
            })
        );
        assert!(parse_command("wheel sideways").is_err());
        assert!(parse_command("wheel up shift").is_err());
    }

    #[test]
    fn admin_form_fields() {
        let ControlCommand::Admin(form) = ok("admin user_id=5 x= refresh_interval=30") else {
            panic!("expected admin command");
        };
        assert_eq!(form.user_id.as_deref(), Some("5"));
        assert_eq!(form.x.as_deref(), Some(""));
        assert_eq!(form.y, None);
        assert_eq!(form.refresh_interval.as_deref(), Some("30"));
        assert_eq!(
            parse_command("admin colour=red"),
            Err(ParseError::UnknownKey("colour".into()))
        );
        assert!(parse_command("admin").is_err());
        assert!(parse_command("admin size").is_err());
    }

    #[test]
    fn unknown_command() {
        assert!(matches!(parse_command("dance"), Err(ParseError::Unknown(_))));
        assert!(matches!(parse_command("quit now"), Err(ParseError::Unknown(_))));
    }

    #[test]
    fn help_lists_every_settings_key() {
        assert_eq!(ok("help"), ControlCommand::Help);
        for key in SettingsForm::KEYS {
            assert!(HELP.contains(key), "{key} missing from help");
        }
    }
}
