//! Hit-testing for pointer events against the last rendered frame.

use tuirealm::ratatui::layout::Rect;

use super::messages::Message;

#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub enum InteractionLayer {
    Base,
    Dialog,
    ContextMenu,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InteractionKind {
    Hover,
    LeftClick,
    RightClick,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InteractionNode {
    pub rect: Rect,
    pub message: Message,
    pub layer: InteractionLayer,
    pub right_clickable: bool,
}

impl InteractionNode {
    fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.rect.x
            && col < self.rect.right()
            && row >= self.rect.y
            && row < self.rect.bottom()
    }

    fn supports(&self, kind: InteractionKind) -> bool {
        match kind {
            InteractionKind::Hover | InteractionKind::LeftClick => true,
            InteractionKind::RightClick => self.right_clickable,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct InteractionMap {
    nodes: Vec<InteractionNode>,
}

impl InteractionMap {
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn register_click(&mut self, layer: InteractionLayer, rect: Rect, message: Message) {
        self.nodes.push(InteractionNode {
            rect,
            message,
            layer,
            right_clickable: false,
        });
    }

    /// Card bodies: left press starts a long press, right click opens the menu.
    pub fn register_task(&mut self, rect: Rect, message: Message) {
        self.nodes.push(InteractionNode {
            rect,
            message,
            layer: InteractionLayer::Base,
            right_clickable: true,
        });
    }

    pub fn resolve_message(&self, col: u16, row: u16, kind: InteractionKind) -> Option<Message> {
        self.resolve_node(col, row, kind)
            .map(|node| node.message.clone())
    }

    /// Topmost layer wins; within a layer the latest registration wins.
    pub fn resolve_node(
        &self,
        col: u16,
        row: u16,
        kind: InteractionKind,
    ) -> Option<&InteractionNode> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.contains(col, row) && node.supports(kind))
            .max_by_key(|(index, node)| (node.layer, *index))
            .map(|(_, node)| node)
    }
}
