use std::time::Instant;

use anyhow::Result;
use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

use crate::app::long_press::Release;
use crate::app::{App, InteractionKind, InteractionLayer, Message};

impl App {
    /// Pointer input with an explicit clock so gestures can be replayed in
    /// tests.
    pub fn handle_mouse_at(&mut self, mouse: MouseEvent, now: Instant) -> Result<()> {
        let at = (mouse.column, mouse.row);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.hovered_message = None;

                if let Some((_, area)) = self.long_press.menu() {
                    let inside = at.0 >= area.x
                        && at.0 < area.right()
                        && at.1 >= area.y
                        && at.1 < area.bottom();
                    if !inside {
                        self.long_press.close();
                        return Ok(());
                    }
                    if let Some(message) =
                        self.resolve_at_layer(at, InteractionKind::LeftClick, InteractionLayer::ContextMenu)
                    {
                        self.update(message)?;
                    }
                    return Ok(());
                }

                let floor = if self.active_dialog.is_open() {
                    InteractionLayer::Dialog
                } else {
                    InteractionLayer::Base
                };
                let Some(node) = self
                    .interaction_map
                    .resolve_node(at.0, at.1, InteractionKind::LeftClick)
                    .filter(|node| node.layer >= floor)
                else {
                    return Ok(());
                };

                match (node.message.clone(), node.right_clickable) {
                    (Message::SelectTask(id), true) => self.long_press.press(id, at, now),
                    (message, _) => self.update(message)?,
                }
            }

            MouseEventKind::Drag(MouseButton::Left) => {
                self.long_press.pointer_moved(at);
            }

            MouseEventKind::Up(MouseButton::Left) => match self.long_press.release(now) {
                Release::Click(id) => self.update(Message::SelectTask(id))?,
                Release::MenuOpened(id) => self.on_menu_opened(id),
                Release::Cancelled | Release::Ignored => {}
            },

            MouseEventKind::Down(MouseButton::Right) => {
                self.long_press.cancel_press();
                if self.active_dialog.is_open() {
                    return Ok(());
                }
                match self.resolve_at_layer(at, InteractionKind::RightClick, InteractionLayer::Base) {
                    Some(Message::SelectTask(id)) => self.open_menu_at(id, at),
                    _ => self.long_press.close(),
                }
            }

            MouseEventKind::Moved => {
                self.hovered_message =
                    self.interaction_map
                        .resolve_message(at.0, at.1, InteractionKind::Hover);
            }

            MouseEventKind::ScrollDown => self.handle_scroll(1)?,
            MouseEventKind::ScrollUp => self.handle_scroll(-1)?,

            _ => {}
        }

        Ok(())
    }

    fn resolve_at_layer(
        &self,
        at: (u16, u16),
        kind: InteractionKind,
        floor: InteractionLayer,
    ) -> Option<Message> {
        self.interaction_map
            .resolve_node(at.0, at.1, kind)
            .filter(|node| node.layer >= floor)
            .map(|node| node.message.clone())
    }

    pub(crate) fn handle_scroll(&mut self, delta: isize) -> Result<()> {
        self.long_press.cancel_press();
        if self.active_dialog.is_open() || self.long_press.menu().is_some() {
            return Ok(());
        }
        self.update(if delta > 0 {
            Message::SelectDown
        } else {
            Message::SelectUp
        })
    }
}
