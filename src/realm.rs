//! tui-realm event loop glue: one root component forwards terminal events to
//! [`App::update`] and draws the board through [`ui::render`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossterm::event::{
    KeyCode as CrosstermKeyCode, KeyEvent as CrosstermKeyEvent,
    KeyModifiers as CrosstermKeyModifiers, MouseButton as CrosstermMouseButton,
    MouseEvent as CrosstermMouseEvent, MouseEventKind as CrosstermMouseEventKind,
};
use tuirealm::{
    Application, AttrValue, Attribute, Component, Event, EventListenerCfg, Frame, MockComponent,
    NoUserEvent, Props, State,
    command::{Cmd, CmdResult},
    event::{
        Key as RealmKey, KeyEvent as RealmKeyEvent, KeyModifiers as RealmKeyModifiers,
        MouseButton as RealmMouseButton, MouseEvent as RealmMouseEvent,
        MouseEventKind as RealmMouseEventKind,
    },
    ratatui::layout::Rect,
};

use crate::{
    app::{App, Message},
    ui,
};

/// Drives long-press detection and store result draining.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

pub type SharedApp = Arc<Mutex<App>>;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum BoardId {
    Board,
}

pub fn init_application(app: SharedApp) -> Result<Application<BoardId, Message, NoUserEvent>> {
    let mut application: Application<BoardId, Message, NoUserEvent> = Application::init(
        EventListenerCfg::default()
            .crossterm_input_listener(Duration::from_millis(20), 3)
            .poll_timeout(Duration::from_millis(10))
            .tick_interval(TICK_INTERVAL),
    );

    application
        .mount(BoardId::Board, Box::new(BoardComponent::new(app)), Vec::new())
        .context("failed to mount board component")?;

    application
        .active(&BoardId::Board)
        .context("failed to activate board component")?;

    Ok(application)
}

pub fn apply_message(shared_app: &SharedApp, message: Message) -> Result<()> {
    let mut app = lock_app(shared_app)?;
    app.update(message)
}

pub fn should_quit(shared_app: &SharedApp) -> Result<bool> {
    let app = lock_app(shared_app)?;
    Ok(app.should_quit())
}

pub fn shutdown(shared_app: &SharedApp) -> Result<()> {
    let mut app = lock_app(shared_app)?;
    app.shutdown();
    Ok(())
}

fn lock_app(shared_app: &SharedApp) -> Result<MutexGuard<'_, App>> {
    shared_app
        .lock()
        .map_err(|_| anyhow!("board state lock poisoned"))
}

struct BoardComponent {
    props: Props,
    app: SharedApp,
}

impl BoardComponent {
    fn new(app: SharedApp) -> Self {
        Self {
            props: Props::default(),
            app,
        }
    }
}

impl MockComponent for BoardComponent {
    fn view(&mut self, frame: &mut Frame, _area: Rect) {
        if let Ok(mut app) = self.app.lock() {
            ui::render(frame, &mut app);
        }
    }

    fn query(&self, attr: Attribute) -> Option<AttrValue> {
        self.props.get(attr)
    }

    fn attr(&mut self, attr: Attribute, value: AttrValue) {
        self.props.set(attr, value);
    }

    fn state(&self) -> State {
        State::None
    }

    fn perform(&mut self, _cmd: Cmd) -> CmdResult {
        CmdResult::None
    }
}

impl Component<Message, NoUserEvent> for BoardComponent {
    fn on(&mut self, ev: Event<NoUserEvent>) -> Option<Message> {
        event_to_message(ev)
    }
}

fn event_to_message(ev: Event<NoUserEvent>) -> Option<Message> {
    match ev {
        Event::Keyboard(key) => convert_key_event(key).map(Message::Key),
        Event::Mouse(mouse) => convert_mouse_event(mouse).map(Message::Mouse),
        Event::WindowResize(width, height) => Some(Message::Resize(width, height)),
        Event::Tick => Some(Message::Tick),
        _ => None,
    }
}

/// Keys the board has no binding for are dropped here.
fn convert_key_event(key: RealmKeyEvent) -> Option<CrosstermKeyEvent> {
    let code = match key.code {
        RealmKey::Backspace => CrosstermKeyCode::Backspace,
        RealmKey::Enter => CrosstermKeyCode::Enter,
        RealmKey::Left => CrosstermKeyCode::Left,
        RealmKey::Right => CrosstermKeyCode::Right,
        RealmKey::Up => CrosstermKeyCode::Up,
        RealmKey::Down => CrosstermKeyCode::Down,
        RealmKey::Tab => CrosstermKeyCode::Tab,
        RealmKey::BackTab => CrosstermKeyCode::BackTab,
        RealmKey::Delete => CrosstermKeyCode::Delete,
        RealmKey::Char(ch) => CrosstermKeyCode::Char(ch),
        RealmKey::Esc => CrosstermKeyCode::Esc,
        _ => return None,
    };
    Some(CrosstermKeyEvent::new(
        code,
        convert_key_modifiers(key.modifiers),
    ))
}

fn convert_key_modifiers(modifiers: RealmKeyModifiers) -> CrosstermKeyModifiers {
    let mut converted = CrosstermKeyModifiers::empty();
    for (realm, crossterm) in [
        (RealmKeyModifiers::SHIFT, CrosstermKeyModifiers::SHIFT),
        (RealmKeyModifiers::CONTROL, CrosstermKeyModifiers::CONTROL),
        (RealmKeyModifiers::ALT, CrosstermKeyModifiers::ALT),
    ] {
        if modifiers.contains(realm) {
            converted.insert(crossterm);
        }
    }
    converted
}

/// Horizontal scrolling has no meaning on a single-column board.
fn convert_mouse_event(mouse: RealmMouseEvent) -> Option<CrosstermMouseEvent> {
    let kind = match mouse.kind {
        RealmMouseEventKind::Down(button) => CrosstermMouseEventKind::Down(convert_button(button)),
        RealmMouseEventKind::Up(button) => CrosstermMouseEventKind::Up(convert_button(button)),
        RealmMouseEventKind::Drag(button) => CrosstermMouseEventKind::Drag(convert_button(button)),
        RealmMouseEventKind::Moved => CrosstermMouseEventKind::Moved,
        RealmMouseEventKind::ScrollDown => CrosstermMouseEventKind::ScrollDown,
        RealmMouseEventKind::ScrollUp => CrosstermMouseEventKind::ScrollUp,
        RealmMouseEventKind::ScrollLeft | RealmMouseEventKind::ScrollRight => return None,
    };
    Some(CrosstermMouseEvent {
        kind,
        column: mouse.column,
        row: mouse.row,
        modifiers: convert_key_modifiers(mouse.modifiers),
    })
}

fn convert_button(button: RealmMouseButton) -> CrosstermMouseButton {
    match button {
        RealmMouseButton::Left => CrosstermMouseButton::Left,
        RealmMouseButton::Right => CrosstermMouseButton::Right,
        RealmMouseButton::Middle => CrosstermMouseButton::Middle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn realm_mouse(kind: RealmMouseEventKind) -> RealmMouseEvent {
        RealmMouseEvent {
            kind,
            column: 10,
            row: 20,
            modifiers: RealmKeyModifiers::empty(),
        }
    }

    #[test]
    fn test_tick_and_resize_become_messages() {
        assert_eq!(event_to_message(Event::Tick), Some(Message::Tick));
        assert_eq!(
            event_to_message(Event::WindowResize(120, 40)),
            Some(Message::Resize(120, 40))
        );
    }

    #[test]
    fn test_unbound_keys_are_dropped() {
        let home = RealmKeyEvent {
            code: RealmKey::Home,
            modifiers: RealmKeyModifiers::empty(),
        };
        assert_eq!(convert_key_event(home), None);

        let ctrl_s = RealmKeyEvent {
            code: RealmKey::Char('s'),
            modifiers: RealmKeyModifiers::CONTROL,
        };
        let converted = convert_key_event(ctrl_s).expect("bound key");
        assert_eq!(converted.code, CrosstermKeyCode::Char('s'));
        assert!(converted.modifiers.contains(CrosstermKeyModifiers::CONTROL));
    }

    #[test]
    fn test_press_drag_release_survive_conversion() {
        for (realm, crossterm) in [
            (
                RealmMouseEventKind::Down(RealmMouseButton::Left),
                CrosstermMouseEventKind::Down(CrosstermMouseButton::Left),
            ),
            (
                RealmMouseEventKind::Drag(RealmMouseButton::Left),
                CrosstermMouseEventKind::Drag(CrosstermMouseButton::Left),
            ),
            (
                RealmMouseEventKind::Up(RealmMouseButton::Left),
                CrosstermMouseEventKind::Up(CrosstermMouseButton::Left),
            ),
            (
                RealmMouseEventKind::Down(RealmMouseButton::Right),
                CrosstermMouseEventKind::Down(CrosstermMouseButton::Right),
            ),
        ] {
            let converted = convert_mouse_event(realm_mouse(realm)).expect("pointer event");
            assert_eq!(converted.kind, crossterm);
            assert_eq!((converted.column, converted.row), (10, 20));
        }
    }

    #[test]
    fn test_horizontal_scroll_is_dropped() {
        assert_eq!(
            convert_mouse_event(realm_mouse(RealmMouseEventKind::ScrollLeft)),
            None
        );
        assert_eq!(
            convert_mouse_event(realm_mouse(RealmMouseEventKind::ScrollDown)).map(|m| m.kind),
            Some(CrosstermMouseEventKind::ScrollDown)
        );
    }
}
