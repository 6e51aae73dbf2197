//! Long-press detection and context-menu placement for pointer input.
//!
//! Time is passed in explicitly so the machine can be driven from ticks and
//! tested without sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tuirealm::ratatui::layout::Rect;
use uuid::Uuid;

pub const MENU_WIDTH: u16 = 16;
pub const MENU_HEIGHT: u16 = 4;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LongPressConfig {
    pub duration: Duration,
    /// Chebyshev distance in cells a press may wander before it is cancelled.
    pub move_threshold: u16,
    pub margin: u16,
}

impl Default for LongPressConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(500),
            move_threshold: 1,
            margin: 1,
        }
    }
}

/// Counts live pointer listeners across press and menu states.
#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    active: Arc<AtomicUsize>,
}

impl ListenerRegistry {
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn register(&self, kinds: &'static [ListenerKind]) -> ListenerGuard {
        self.active.fetch_add(kinds.len(), Ordering::SeqCst);
        ListenerGuard {
            registry: self.clone(),
            kinds,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ListenerKind {
    PointerMove,
    PointerUp,
    Scroll,
    OutsideClick,
    Escape,
}

const PRESS_LISTENERS: &[ListenerKind] = &[
    ListenerKind::PointerMove,
    ListenerKind::PointerUp,
    ListenerKind::Scroll,
];
const MENU_LISTENERS: &[ListenerKind] = &[ListenerKind::OutsideClick, ListenerKind::Escape];

#[derive(Debug)]
pub struct ListenerGuard {
    registry: ListenerRegistry,
    kinds: &'static [ListenerKind],
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.registry
            .active
            .fetch_sub(self.kinds.len(), Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub enum PressState {
    Idle,
    Pressing {
        task_id: Uuid,
        origin: (u16, u16),
        pointer: (u16, u16),
        moved: bool,
        started_at: Instant,
        listeners: ListenerGuard,
    },
    MenuOpen {
        task_id: Uuid,
        area: Rect,
        listeners: ListenerGuard,
    },
}

/// What a button release resolved to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Release {
    /// Short press that never moved.
    Click(Uuid),
    /// The press had already reached its duration.
    MenuOpened(Uuid),
    Cancelled,
    Ignored,
}

#[derive(Debug)]
pub struct LongPress {
    config: LongPressConfig,
    viewport: Rect,
    state: PressState,
    registry: ListenerRegistry,
}

impl LongPress {
    pub fn new(config: LongPressConfig, viewport: Rect) -> Self {
        Self {
            config,
            viewport,
            state: PressState::Idle,
            registry: ListenerRegistry::default(),
        }
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    pub fn state(&self) -> &PressState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, PressState::Idle)
    }

    pub fn pressing_task(&self) -> Option<Uuid> {
        match self.state {
            PressState::Pressing { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    pub fn menu(&self) -> Option<(Uuid, Rect)> {
        match self.state {
            PressState::MenuOpen { task_id, area, .. } => Some((task_id, area)),
            _ => None,
        }
    }

    /// Left button went down on a card.
    pub fn press(&mut self, task_id: Uuid, at: (u16, u16), now: Instant) {
        self.state = PressState::Pressing {
            task_id,
            origin: at,
            pointer: at,
            moved: false,
            started_at: now,
            listeners: self.registry.register(PRESS_LISTENERS),
        };
    }

    /// Returns true when the move cancelled a pending press.
    pub fn pointer_moved(&mut self, at: (u16, u16)) -> bool {
        let PressState::Pressing {
            origin,
            pointer,
            moved,
            ..
        } = &mut self.state
        else {
            return false;
        };

        *pointer = at;
        if at != *origin {
            *moved = true;
        }
        if chebyshev(*origin, at) > self.config.move_threshold {
            self.state = PressState::Idle;
            return true;
        }
        false
    }

    pub fn release(&mut self, now: Instant) -> Release {
        let PressState::Pressing {
            task_id,
            moved,
            started_at,
            ..
        } = self.state
        else {
            return Release::Ignored;
        };

        if now.saturating_duration_since(started_at) >= self.config.duration {
            return match self.fire(now) {
                Some(task_id) => Release::MenuOpened(task_id),
                None => Release::Cancelled,
            };
        }

        self.state = PressState::Idle;
        if moved {
            Release::Cancelled
        } else {
            Release::Click(task_id)
        }
    }

    /// Scroll or any other gesture that rules out a long press.
    pub fn cancel_press(&mut self) {
        if matches!(self.state, PressState::Pressing { .. }) {
            self.state = PressState::Idle;
        }
    }

    /// Opens the menu once the press has been held long enough.
    pub fn fire(&mut self, now: Instant) -> Option<Uuid> {
        let PressState::Pressing {
            task_id,
            pointer,
            started_at,
            ..
        } = self.state
        else {
            return None;
        };
        if now.saturating_duration_since(started_at) < self.config.duration {
            return None;
        }
        self.open_at(task_id, pointer);
        Some(task_id)
    }

    pub fn open_at(&mut self, task_id: Uuid, anchor: (u16, u16)) {
        let area = clamp_menu(anchor, (MENU_WIDTH, MENU_HEIGHT), self.viewport, self.config.margin);
        // Drop any press listeners before registering the menu's.
        self.state = PressState::Idle;
        self.state = PressState::MenuOpen {
            task_id,
            area,
            listeners: self.registry.register(MENU_LISTENERS),
        };
    }

    pub fn open_centered(&mut self, task_id: Uuid) {
        let anchor = (
            self.viewport.x + self.viewport.width.saturating_sub(MENU_WIDTH) / 2,
            self.viewport.y + self.viewport.height.saturating_sub(MENU_HEIGHT) / 2,
        );
        self.open_at(task_id, anchor);
    }

    pub fn close(&mut self) {
        self.state = PressState::Idle;
    }

    /// Viewport changed; any gesture in progress is abandoned.
    pub fn reset(&mut self, viewport: Rect) {
        self.viewport = viewport;
        self.state = PressState::Idle;
    }
}

fn chebyshev(a: (u16, u16), b: (u16, u16)) -> u16 {
    a.0.abs_diff(b.0).max(a.1.abs_diff(b.1))
}

/// Places a `size` box at `anchor`, shifted so it stays `margin` cells inside
/// `viewport`. When the viewport is too small the box is pinned to the
/// top-left margin and truncated.
pub fn clamp_menu(anchor: (u16, u16), size: (u16, u16), viewport: Rect, margin: u16) -> Rect {
    let axis = |anchor: u16, len: u16, start: u16, extent: u16| -> (u16, u16) {
        let min = start.saturating_add(margin);
        let end = start.saturating_add(extent).saturating_sub(margin);
        let len = len.min(end.saturating_sub(min));
        let max = end.saturating_sub(len).max(min);
        (anchor.clamp(min, max), len)
    };
    let (x, width) = axis(anchor.0, size.0, viewport.x, viewport.width);
    let (y, height) = axis(anchor.1, size.1, viewport.y, viewport.height);
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Rect = Rect {
        x: 0,
        y: 0,
        width: 80,
        height: 24,
    };

    fn machine() -> (LongPress, Uuid, Instant) {
        (
            LongPress::new(LongPressConfig::default(), VIEWPORT),
            Uuid::new_v4(),
            Instant::now(),
        )
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_release_before_duration_never_opens() {
        let (mut press, id, t0) = machine();
        for held in [0, 1, 250, 499] {
            press.press(id, (10, 5), t0);
            assert_eq!(press.fire(t0 + ms(held)), None);
            assert_eq!(press.release(t0 + ms(held)), Release::Click(id));
            assert!(press.menu().is_none());
            assert_eq!(press.registry().active(), 0);
        }
    }

    #[test]
    fn test_move_beyond_threshold_cancels() {
        let (mut press, id, t0) = machine();
        press.press(id, (10, 5), t0);
        assert!(!press.pointer_moved((11, 6)));
        assert!(press.pointer_moved((12, 6)));
        assert!(press.is_idle());
        assert_eq!(press.fire(t0 + ms(2_000)), None);
        assert_eq!(press.release(t0 + ms(2_000)), Release::Ignored);
        assert_eq!(press.registry().active(), 0);
    }

    #[test]
    fn test_small_wobble_is_not_a_click() {
        let (mut press, id, t0) = machine();
        press.press(id, (10, 5), t0);
        press.pointer_moved((11, 5));
        assert_eq!(press.release(t0 + ms(100)), Release::Cancelled);
    }

    #[test]
    fn test_sustained_press_opens_at_pointer() {
        let (mut press, id, t0) = machine();
        press.press(id, (10, 5), t0);
        press.pointer_moved((11, 5));
        assert_eq!(press.fire(t0 + ms(499)), None);
        assert_eq!(press.fire(t0 + ms(500)), Some(id));

        let (menu_task, area) = press.menu().expect("menu should be open");
        assert_eq!(menu_task, id);
        assert_eq!((area.x, area.y), (11, 5));
        assert_eq!(press.registry().active(), MENU_LISTENERS.len());

        assert_eq!(press.release(t0 + ms(600)), Release::Ignored);
        assert!(press.menu().is_some());
    }

    #[test]
    fn test_release_after_duration_opens_menu() {
        let (mut press, id, t0) = machine();
        press.press(id, (3, 3), t0);
        assert_eq!(press.release(t0 + ms(750)), Release::MenuOpened(id));
        assert!(press.menu().is_some());
    }

    #[test]
    fn test_menu_is_clamped_inside_viewport_for_every_anchor() {
        let config = LongPressConfig::default();
        for x in (0..VIEWPORT.width).step_by(3) {
            for y in 0..VIEWPORT.height {
                let area = clamp_menu((x, y), (MENU_WIDTH, MENU_HEIGHT), VIEWPORT, config.margin);
                assert!(area.x >= config.margin);
                assert!(area.y >= config.margin);
                assert!(area.right() <= VIEWPORT.right() - config.margin);
                assert!(area.bottom() <= VIEWPORT.bottom() - config.margin);
                assert_eq!((area.width, area.height), (MENU_WIDTH, MENU_HEIGHT));
            }
        }
    }

    #[test]
    fn test_clamp_truncates_in_tiny_viewport() {
        let area = clamp_menu((5, 5), (MENU_WIDTH, MENU_HEIGHT), Rect::new(0, 0, 10, 3), 1);
        assert_eq!(area, Rect::new(1, 1, 8, 1));
    }

    #[test]
    fn test_open_centered() {
        let (mut press, id, _) = machine();
        press.open_centered(id);
        let (_, area) = press.menu().expect("menu should be open");
        assert_eq!(area.x, (80 - MENU_WIDTH) / 2);
        assert_eq!(area.y, (24 - MENU_HEIGHT) / 2);
    }

    #[test]
    fn test_listeners_released_on_every_exit_path() {
        let (mut press, id, t0) = machine();
        let registry = press.registry().clone();

        press.press(id, (1, 1), t0);
        assert_eq!(registry.active(), PRESS_LISTENERS.len());
        press.cancel_press();
        assert_eq!(registry.active(), 0);

        press.press(id, (1, 1), t0);
        press.fire(t0 + ms(500));
        press.close();
        assert_eq!(registry.active(), 0);

        press.open_at(id, (4, 4));
        press.reset(Rect::new(0, 0, 40, 12));
        assert_eq!(registry.active(), 0);

        press.press(id, (1, 1), t0);
        press.press(id, (2, 2), t0);
        assert_eq!(registry.active(), PRESS_LISTENERS.len());

        press.open_centered(id);
        drop(press);
        assert_eq!(registry.active(), 0);
    }
}
