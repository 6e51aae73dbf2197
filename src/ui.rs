use tuirealm::ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

use crate::app::form::{TaskFormField, TaskFormState};
use crate::app::view::TaskCardView;
use crate::app::{
    ActiveDialog, App, ConfirmCancelField, ConfirmDeleteState, HELP_ENTRIES, InteractionLayer,
    MenuItem, Message, today,
};
use crate::theme::Theme;

const CARD_HEIGHT: u16 = 4;
const CHECKBOX_WIDTH: u16 = 4;
const MENU_BUTTON_WIDTH: u16 = 3;
const ADD_BUTTON_WIDTH: u16 = 7;

pub fn render(frame: &mut Frame<'_>, app: &mut App) {
    app.interaction_map.clear();

    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(app.theme.base.canvas)),
        area,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    render_cards(frame, chunks[1], app);
    render_footer(frame, chunks[2], app);

    if app.long_press.menu().is_some() {
        render_context_menu(frame, app);
    }

    if app.active_dialog.is_open() {
        render_dialog(frame, app);
    }
}

fn render_header(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let theme = app.theme;
    let title = format!(" Homework Tracker ({}) ", app.tasks.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.interactive.border))
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme.base.header)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(ADD_BUTTON_WIDTH)])
        .split(inner);

    let (query, style) = if app.search.query.is_empty() && !app.search.focused {
        (
            "/ search title or subject".to_string(),
            Style::default().fg(theme.base.text_muted),
        )
    } else {
        let cursor = if app.search.focused { "▏" } else { "" };
        let color = if app.search.focused {
            theme.interactive.focus
        } else {
            theme.base.text
        };
        (
            format!("🔍 {}{cursor}", app.search.query),
            Style::default().fg(color),
        )
    };
    frame.render_widget(Paragraph::new(query).style(style), parts[0]);
    app.interaction_map
        .register_click(InteractionLayer::Base, parts[0], Message::FocusSearch);

    let hovered = app.hovered_message == Some(Message::OpenNewTaskForm);
    let add_style = if hovered {
        Style::default()
            .fg(theme.dialog.button_fg)
            .bg(theme.dialog.button_bg)
    } else {
        Style::default()
            .fg(theme.base.accent)
            .add_modifier(Modifier::BOLD)
    };
    frame.render_widget(
        Paragraph::new(" [+] ").alignment(Alignment::Right).style(add_style),
        parts[1],
    );
    app.interaction_map
        .register_click(InteractionLayer::Base, parts[1], Message::OpenNewTaskForm);
}

fn render_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let theme = app.theme;
    let status = match (app.loading, app.last_synced) {
        (true, _) => "syncing…".to_string(),
        (false, Some(at)) => format!("synced {}", at.format("%H:%M:%S")),
        (false, None) => "not synced".to_string(),
    };
    let live = if app.is_live() { " ● live" } else { "" };
    let right = format!(" {} · {status}{live} ", app.backend_label);

    let left = app.footer_notice.clone().unwrap_or_else(|| {
        " n: new  space: done  enter: edit  d: delete  m: menu  /: search  ?: help  q: quit "
            .to_string()
    });
    let left_style = if app.footer_notice.is_some() {
        Style::default().fg(theme.base.danger)
    } else {
        Style::default().fg(theme.base.text_muted)
    };

    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(right.chars().count() as u16),
        ])
        .split(area);
    frame.render_widget(Paragraph::new(left).style(left_style), parts[0]);
    frame.render_widget(
        Paragraph::new(right)
            .alignment(Alignment::Right)
            .style(Style::default().fg(theme.base.text_muted)),
        parts[1],
    );
}

fn render_cards(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let cards = app.visible_cards(today());
    if cards.is_empty() {
        render_empty_state(frame, area, app);
        return;
    }

    let per_page = usize::from((area.height / CARD_HEIGHT).max(1));
    if let Some(selected) = cards.iter().position(|card| card.selected) {
        if selected < app.list_scroll {
            app.list_scroll = selected;
        } else if selected >= app.list_scroll + per_page {
            app.list_scroll = selected + 1 - per_page;
        }
    }
    app.list_scroll = app.list_scroll.min(cards.len().saturating_sub(per_page));

    let mut y = area.y;
    for card in cards.iter().skip(app.list_scroll).take(per_page) {
        let rect = Rect::new(area.x, y, area.width, CARD_HEIGHT.min(area.bottom() - y));
        render_card(frame, rect, card, app);
        y += CARD_HEIGHT;
    }

    if cards.len() > per_page {
        let marker = format!(
            " {}-{} of {} ",
            app.list_scroll + 1,
            (app.list_scroll + per_page).min(cards.len()),
            cards.len()
        );
        let width = (marker.chars().count() as u16).min(area.width);
        frame.render_widget(
            Paragraph::new(marker).style(Style::default().fg(app.theme.base.text_muted)),
            Rect::new(area.right() - width, area.bottom().saturating_sub(1), width, 1),
        );
    }
}

fn render_card(frame: &mut Frame<'_>, rect: Rect, card: &TaskCardView, app: &mut App) {
    let theme = app.theme;
    let colors = theme.card_colors(card.selected);
    let (student_base, student_shade) = theme.student_colors(card.student);
    let border = if card.selected {
        colors.border
    } else {
        student_shade
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if card.selected {
            BorderType::Thick
        } else {
            BorderType::Rounded
        })
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(colors.background));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);
    if inner.height == 0 || inner.width <= CHECKBOX_WIDTH + MENU_BUTTON_WIDTH {
        return;
    }

    app.interaction_map
        .register_task(rect, Message::SelectTask(card.id));

    let checkbox = Rect::new(inner.x, inner.y, CHECKBOX_WIDTH, 1);
    let menu_button = Rect::new(inner.right() - MENU_BUTTON_WIDTH, inner.y, MENU_BUTTON_WIDTH, 1);
    let title_area = Rect::new(
        checkbox.right(),
        inner.y,
        inner.width - CHECKBOX_WIDTH - MENU_BUTTON_WIDTH,
        1,
    );

    let check = if card.completed { "[x]" } else { "[ ]" };
    let check_color = if card.completed {
        theme.urgency.done
    } else {
        theme.base.text
    };
    frame.render_widget(
        Paragraph::new(check).style(Style::default().fg(check_color)),
        checkbox,
    );
    app.interaction_map.register_click(
        InteractionLayer::Base,
        checkbox,
        Message::ToggleTaskCompleted(card.id),
    );

    let mut title_style = Style::default()
        .fg(theme.base.text)
        .add_modifier(Modifier::BOLD);
    if card.completed {
        title_style = Style::default()
            .fg(theme.base.text_muted)
            .add_modifier(Modifier::CROSSED_OUT);
    }
    frame.render_widget(
        Paragraph::new(card.title.as_str()).style(title_style),
        title_area,
    );

    frame.render_widget(
        Paragraph::new(" ⋯ ").style(Style::default().fg(theme.interactive.focus)),
        menu_button,
    );
    app.interaction_map.register_click(
        InteractionLayer::Base,
        menu_button,
        Message::OpenTaskMenu(card.id),
    );

    if inner.height < 2 {
        return;
    }

    let due_style = match (card.completed, theme.urgency_color(card.urgency)) {
        (true, _) => Style::default().fg(theme.base.text_muted),
        (false, Some(color)) => Style::default().fg(color).add_modifier(Modifier::BOLD),
        (false, None) => Style::default().fg(theme.base.text),
    };
    let mut details = vec![
        Span::raw("    "),
        Span::raw(format!("{} {}", card.subject.icon(), card.subject)),
        Span::raw("  "),
        Span::styled(
            format!(" {} ", card.student),
            Style::default()
                .fg(Color::Black)
                .bg(student_base)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(card.due_text(), due_style),
    ];
    if let Some(indicator) = card.urgency.indicator()
        && !card.completed
    {
        details.push(Span::raw(" "));
        details.push(Span::styled(indicator, due_style));
    }
    frame.render_widget(
        Paragraph::new(Line::from(details)),
        Rect::new(inner.x, inner.y + 1, inner.width, 1),
    );
}

fn render_empty_state(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let text = if app.loading {
        "Loading tasks…"
    } else if !app.search.query.is_empty() {
        "No tasks match the search. Esc clears it."
    } else {
        "No homework yet. Press n or click [+] to add a task."
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.base.text_muted)),
        rows[1],
    );
}

fn render_context_menu(frame: &mut Frame<'_>, app: &mut App) {
    let Some((_, area)) = app.long_press.menu() else {
        return;
    };
    let theme = app.theme;
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.interactive.focus))
        .style(Style::default().bg(theme.dialog.surface));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    for (index, item) in MenuItem::ALL.iter().enumerate() {
        let row = inner.y + index as u16;
        if row >= inner.bottom() {
            break;
        }
        let rect = Rect::new(inner.x, row, inner.width, 1);
        let active = index == app.menu_index || app.hovered_message == Some(item.message());
        let color = if *item == MenuItem::Delete {
            theme.base.danger
        } else {
            theme.base.text
        };
        let style = if active {
            Style::default()
                .fg(theme.dialog.button_fg)
                .bg(theme.dialog.button_bg)
        } else {
            Style::default().fg(color)
        };
        frame.render_widget(Paragraph::new(format!(" {}", item.label())).style(style), rect);
        app.interaction_map
            .register_click(InteractionLayer::ContextMenu, rect, item.message());
    }
}

fn render_dialog(frame: &mut Frame<'_>, app: &mut App) {
    let theme = app.theme;
    let (width, height, title) = match &app.active_dialog {
        ActiveDialog::TaskForm(form) if form.is_edit() => (56, 17, " Edit Task "),
        ActiveDialog::TaskForm(_) => (56, 17, " New Task "),
        ActiveDialog::ConfirmDelete(_) => (48, 8, " Delete Task "),
        ActiveDialog::Help => (52, HELP_ENTRIES.len() as u16 + 4, " Help "),
        ActiveDialog::None => return,
    };

    let area = centered_rect(width, height, frame.area());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(theme.interactive.focus))
        .title(title)
        .title_alignment(Alignment::Center)
        .style(Style::default().bg(theme.dialog.surface).fg(theme.base.text));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut nodes = Vec::new();
    match &app.active_dialog {
        ActiveDialog::TaskForm(form) => render_task_form(frame, inner, form, &theme, &mut nodes),
        ActiveDialog::ConfirmDelete(state) => {
            render_confirm_delete(frame, inner, state, &theme, &mut nodes)
        }
        ActiveDialog::Help => {
            render_help(frame, inner, &theme);
            nodes.push((area, Message::DismissDialog));
        }
        ActiveDialog::None => {}
    }

    for (rect, message) in nodes {
        app.interaction_map
            .register_click(InteractionLayer::Dialog, rect, message);
    }
}

fn render_task_form(
    frame: &mut Frame<'_>,
    area: Rect,
    form: &TaskFormState,
    theme: &Theme,
    nodes: &mut Vec<(Rect, Message)>,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(area);

    let focused = |field: TaskFormField| form.focused_field == field;

    render_input_field(
        frame,
        rows[0],
        " Title ",
        &form.title,
        focused(TaskFormField::Title),
        theme,
    );
    nodes.push((rows[0], Message::FocusFormField(TaskFormField::Title)));

    render_input_field(
        frame,
        rows[1],
        " Subject  ←/→ ",
        &format!("‹ {} {} ›", form.subject.icon(), form.subject),
        focused(TaskFormField::Subject),
        theme,
    );
    nodes.push((rows[1], Message::FocusFormField(TaskFormField::Subject)));

    render_input_field(
        frame,
        rows[2],
        " Due date (YYYY-MM-DD, optional) ",
        &form.due_input,
        focused(TaskFormField::DueDate),
        theme,
    );
    nodes.push((rows[2], Message::FocusFormField(TaskFormField::DueDate)));

    let (student_base, _) = theme.student_colors(form.student);
    let student_block = input_block(" Student  ←/→ ", focused(TaskFormField::Student), theme);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw("‹ "),
            Span::styled(
                format!(" {} ", form.student),
                Style::default().fg(Color::Black).bg(student_base),
            ),
            Span::raw(" ›"),
        ]))
        .block(student_block),
        rows[3],
    );
    nodes.push((rows[3], Message::FocusFormField(TaskFormField::Student)));

    let status = match (&form.error, form.submitting) {
        (Some(error), _) => Span::styled(error.as_str(), Style::default().fg(theme.base.danger)),
        (None, true) => Span::styled("Saving…", Style::default().fg(theme.base.text_muted)),
        (None, false) => Span::styled(
            "Tab: next field  Enter: save  Esc: cancel",
            Style::default().fg(theme.base.text_muted),
        ),
    };
    frame.render_widget(Paragraph::new(Line::from(status)), rows[4]);

    let buttons = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[5]);
    let submit_label = if form.is_edit() { "Save" } else { "Add" };
    render_button(
        frame,
        buttons[0],
        submit_label,
        focused(TaskFormField::Submit),
        theme,
    );
    render_button(
        frame,
        buttons[1],
        "Cancel",
        focused(TaskFormField::Cancel),
        theme,
    );
    nodes.push((buttons[0], Message::SubmitTaskForm));
    nodes.push((buttons[1], Message::DismissDialog));
}

fn render_confirm_delete(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &ConfirmDeleteState,
    theme: &Theme,
    nodes: &mut Vec<(Rect, Message)>,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(area);
    frame.render_widget(
        Paragraph::new(format!("Delete \"{}\"? This cannot be undone.", state.task_title))
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Center),
        rows[0],
    );

    let buttons = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    render_button(
        frame,
        buttons[0],
        "Delete",
        state.focused_field == ConfirmCancelField::Confirm,
        theme,
    );
    render_button(
        frame,
        buttons[1],
        "Cancel",
        state.focused_field == ConfirmCancelField::Cancel,
        theme,
    );
    nodes.push((buttons[0], Message::ConfirmDeleteTask));
    nodes.push((buttons[1], Message::DismissDialog));
}

fn render_help(frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
    let key_width = HELP_ENTRIES
        .iter()
        .map(|(keys, _)| keys.chars().count())
        .max()
        .unwrap_or(0);
    let mut lines: Vec<Line> = HELP_ENTRIES
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(
                    format!(" {keys:<key_width$}  "),
                    Style::default().fg(theme.interactive.focus),
                ),
                Span::raw(*action),
            ])
        })
        .collect();
    lines.push(Line::from(Span::styled(
        " Hold or right-click a card for its menu",
        Style::default().fg(theme.base.text_muted),
    )));
    frame.render_widget(Paragraph::new(lines), area);
}

fn input_block<'a>(label: &'a str, is_focused: bool, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .title(label)
        .border_style(if is_focused {
            Style::default().fg(theme.interactive.focus)
        } else {
            Style::default().fg(theme.interactive.border)
        })
        .style(Style::default().bg(theme.dialog.input_bg))
}

fn render_input_field(
    frame: &mut Frame<'_>,
    area: Rect,
    label: &str,
    value: &str,
    is_focused: bool,
    theme: &Theme,
) {
    let cursor = if is_focused { "▏" } else { "" };
    frame.render_widget(
        Paragraph::new(format!("{value}{cursor}")).block(input_block(label, is_focused, theme)),
        area,
    );
}

fn render_button(frame: &mut Frame<'_>, area: Rect, label: &str, is_focused: bool, theme: &Theme) {
    let style = if is_focused {
        Style::default()
            .bg(theme.dialog.button_bg)
            .fg(theme.dialog.button_fg)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if is_focused {
            Style::default().fg(theme.interactive.focus)
        } else {
            Style::default().fg(theme.interactive.border)
        })
        .style(style);
    frame.render_widget(
        Paragraph::new(label)
            .alignment(Alignment::Center)
            .block(block),
        area,
    );
}

/// Fixed-size box centred in `r`, shrunk to fit.
fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect::new(
        r.x + (r.width - width) / 2,
        r.y + (r.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_shrinks_to_fit() {
        let r = centered_rect(56, 17, Rect::new(0, 0, 40, 10));
        assert_eq!(r, Rect::new(0, 0, 40, 10));

        let r = centered_rect(20, 4, Rect::new(0, 0, 80, 24));
        assert_eq!(r, Rect::new(30, 10, 20, 4));
    }
}
