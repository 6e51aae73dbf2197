pub mod actions;
pub mod dialogs;
pub mod form;
pub mod interaction;
pub mod long_press;
pub mod messages;
pub mod polling;
pub mod state;
pub mod task_list;
pub mod view;

mod input;
mod update;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tuirealm::ratatui::layout::Rect;
use uuid::Uuid;

use crate::haptics::{self, Haptics};
use crate::settings::Settings;
use crate::store::{Backend, TaskStore};
use crate::theme::Theme;

use self::actions::{StoreEvent, StoreEvents};
use self::form::TaskFormState;
use self::interaction::InteractionMap;
use self::long_press::{ListenerRegistry, LongPress, LongPressConfig};
use self::polling::RefreshPipeline;
use self::task_list::TaskList;

pub use self::input::key::HELP_ENTRIES;
pub use self::interaction::{InteractionKind, InteractionLayer};
pub use self::messages::Message;
pub use self::state::{
    ActiveDialog, ConfirmCancelField, ConfirmDeleteState, MenuItem, SearchState,
};

const BUSY_NOTICE: &str = "Another change is still saving; try again in a moment";

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct App {
    pub should_quit: bool,
    pub theme: Theme,
    pub settings: Settings,
    pub viewport: (u16, u16),
    pub tasks: TaskList,
    pub selected_task: Option<Uuid>,
    pub list_scroll: usize,
    pub search: SearchState,
    pub active_dialog: ActiveDialog,
    pub footer_notice: Option<String>,
    pub interaction_map: InteractionMap,
    pub hovered_message: Option<Message>,
    pub long_press: LongPress,
    pub menu_index: usize,
    pub backend_label: String,
    pub loading: bool,
    pub last_synced: Option<DateTime<Local>>,
    store: Arc<dyn TaskStore>,
    events_tx: StoreEvents,
    events_rx: mpsc::UnboundedReceiver<StoreEvent>,
    refresh: Option<RefreshPipeline>,
    haptics: Box<dyn Haptics>,
    mutation_in_flight: bool,
    settings_path: Option<PathBuf>,
}

impl App {
    /// Builds the board and kicks off the first fetch plus the background
    /// refresh pipeline. Must be called inside a tokio runtime.
    pub fn new(backend: Backend, settings: Settings, haptics: Box<dyn Haptics>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let long_press = LongPress::new(
            LongPressConfig {
                duration: settings.long_press(),
                move_threshold: settings.move_threshold,
                margin: settings.menu_margin,
            },
            Rect::new(0, 0, 80, 24),
        );

        let refresh_store = Arc::clone(&backend.store);
        let refresh_events = events_tx.clone();
        let refresh = RefreshPipeline::start(
            settings.refresh_debounce(),
            settings.poll_interval(),
            backend.feed.clone(),
            move || actions::spawn_fetch(Arc::clone(&refresh_store), refresh_events.clone()),
        );

        info!(backend = %backend.label, "board starting");

        let mut app = Self {
            should_quit: false,
            theme: Theme::from_preset(settings.theme_preset()),
            settings,
            viewport: (80, 24),
            tasks: TaskList::default(),
            selected_task: None,
            list_scroll: 0,
            search: SearchState::default(),
            active_dialog: ActiveDialog::None,
            footer_notice: None,
            interaction_map: InteractionMap::default(),
            hovered_message: None,
            long_press,
            menu_index: 0,
            backend_label: backend.label,
            loading: false,
            last_synced: None,
            store: backend.store,
            events_tx,
            events_rx,
            refresh: Some(refresh),
            haptics,
            mutation_in_flight: false,
            settings_path: None,
        };
        app.refresh_now();
        app
    }

    /// Theme changes are written back to this file.
    pub fn with_settings_path(mut self, path: Option<PathBuf>) -> Self {
        self.settings_path = path;
        self
    }

    pub fn with_notice(mut self, notice: Option<String>) -> Self {
        if notice.is_some() {
            self.footer_notice = notice;
        }
        self
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn listener_registry(&self) -> ListenerRegistry {
        self.long_press.registry().clone()
    }

    pub fn mutation_in_flight(&self) -> bool {
        self.mutation_in_flight
    }

    pub fn is_live(&self) -> bool {
        self.refresh
            .as_ref()
            .is_some_and(RefreshPipeline::is_subscribed)
    }

    /// Stops background refreshes and cancels any gesture. In-flight store
    /// requests still deliver their results.
    pub fn shutdown(&mut self) {
        self.refresh = None;
        let viewport = Rect::new(0, 0, self.viewport.0, self.viewport.1);
        self.long_press.reset(viewport);
    }

    pub fn refresh_now(&mut self) {
        self.loading = true;
        actions::spawn_fetch(Arc::clone(&self.store), self.events_tx.clone());
    }

    fn request_refresh(&mut self) {
        match &self.refresh {
            Some(refresh) => refresh.request_refresh(),
            None => self.refresh_now(),
        }
    }

    /// Applies every finished store call. Returns true when anything changed.
    pub fn drain_store_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_store_event(event);
            changed = true;
        }
        changed
    }

    fn apply_store_event(&mut self, event: StoreEvent) {
        if event.is_mutation() {
            self.mutation_in_flight = false;
        }

        match event {
            StoreEvent::Fetched(Ok(tasks)) => {
                self.loading = false;
                self.last_synced = Some(Local::now());
                self.tasks.replace(tasks);
                self.retain_valid_selection();
            }
            StoreEvent::Fetched(Err(err)) => {
                warn!(error = %err, "failed to load tasks");
                self.loading = false;
                self.tasks.replace(Vec::new());
                self.retain_valid_selection();
                self.footer_notice = Some(format!("Failed to load tasks: {err}"));
            }
            StoreEvent::Created(result) | StoreEvent::Edited(result) => match result {
                Ok(task) => {
                    if matches!(&self.active_dialog, ActiveDialog::TaskForm(form) if form.submitting)
                    {
                        self.active_dialog = ActiveDialog::None;
                    }
                    self.selected_task = Some(task.id);
                    self.footer_notice = Some(format!("Saved '{}'", task.title));
                    self.request_refresh();
                }
                Err(err) => {
                    warn!(error = %err, "failed to save task");
                    if let ActiveDialog::TaskForm(form) = &mut self.active_dialog {
                        form.submitting = false;
                        form.error = Some(format!("Could not save: {err}"));
                    } else {
                        self.footer_notice = Some(format!("Could not save task: {err}"));
                    }
                }
            },
            StoreEvent::Toggled { token, result } => match result {
                Ok(_) => self.request_refresh(),
                Err(err) => {
                    warn!(error = %err, task_id = %token.task_id(), "failed to toggle task");
                    self.tasks.rollback(token);
                    self.footer_notice = Some(format!("Could not update task: {err}"));
                }
            },
            StoreEvent::Deleted { id, token, result } => match result {
                Ok(()) => {
                    self.footer_notice = Some("Task deleted".to_string());
                    self.request_refresh();
                }
                Err(err) => {
                    warn!(error = %err, task_id = %id, "failed to delete task");
                    if let Some(token) = token {
                        self.tasks.rollback(token);
                    }
                    self.footer_notice = Some(format!("Could not delete task: {err}"));
                }
            },
        }
    }

    fn retain_valid_selection(&mut self) {
        if let Some(id) = self.selected_task
            && self.tasks.get(id).is_none()
        {
            self.selected_task = None;
        }
    }

    fn begin_mutation(&mut self) -> bool {
        if self.mutation_in_flight {
            self.footer_notice = Some(BUSY_NOTICE.to_string());
            return false;
        }
        self.mutation_in_flight = true;
        true
    }

    pub(crate) fn toggle_completed(&mut self, id: Uuid) {
        if self.tasks.get(id).is_none() || !self.begin_mutation() {
            return;
        }
        match self.tasks.toggle_completed(id) {
            Some((token, completed)) => actions::spawn_toggle(
                Arc::clone(&self.store),
                self.events_tx.clone(),
                token,
                completed,
            ),
            None => self.mutation_in_flight = false,
        }
    }

    pub(crate) fn request_delete(&mut self, id: Uuid) {
        let Some(task) = self.tasks.get(id) else {
            return;
        };
        if self.settings.confirm_delete {
            self.active_dialog = ActiveDialog::ConfirmDelete(ConfirmDeleteState {
                task_id: id,
                task_title: task.title.clone(),
                focused_field: ConfirmCancelField::Cancel,
            });
        } else {
            self.delete_task(id);
        }
    }

    pub(crate) fn delete_task(&mut self, id: Uuid) {
        if !self.begin_mutation() {
            return;
        }
        let token = self.tasks.hide(id);
        actions::spawn_delete(Arc::clone(&self.store), self.events_tx.clone(), id, token);
    }

    pub(crate) fn open_edit_form(&mut self, id: Uuid) {
        if let Some(task) = self.tasks.get(id) {
            self.active_dialog = ActiveDialog::TaskForm(TaskFormState::edit(task));
        }
    }

    pub(crate) fn submit_form(&mut self) {
        let ActiveDialog::TaskForm(form) = &mut self.active_dialog else {
            return;
        };
        if form.submitting || self.mutation_in_flight {
            form.error = Some(BUSY_NOTICE.to_string());
            return;
        }

        let draft = match form.validate(today()) {
            Ok(draft) => draft,
            Err(err) => {
                form.error = Some(err.to_string());
                return;
            }
        };

        form.error = None;
        form.submitting = true;
        self.mutation_in_flight = true;
        let store = Arc::clone(&self.store);
        let events = self.events_tx.clone();
        match form.editing_id() {
            Some(id) => actions::spawn_edit(store, events, id, draft.into_patch()),
            None => actions::spawn_create(store, events, draft.into_task(Uuid::new_v4())),
        }
    }

    pub(crate) fn open_menu_at(&mut self, id: Uuid, anchor: (u16, u16)) {
        self.long_press.open_at(id, anchor);
        self.on_menu_opened(id);
    }

    pub(crate) fn open_menu_centered(&mut self, id: Uuid) {
        self.long_press.open_centered(id);
        self.on_menu_opened(id);
    }

    fn on_menu_opened(&mut self, id: Uuid) {
        self.selected_task = Some(id);
        self.menu_index = 0;
        haptics::pulse_if_supported(self.haptics.as_mut());
    }

    pub(crate) fn cycle_theme(&mut self) {
        let preset = self.theme.preset.next();
        self.theme = Theme::from_preset(preset);
        self.settings.theme = preset.as_str().to_string();
        if let Some(path) = &self.settings_path
            && let Err(err) = self.settings.save_to_path(path)
        {
            warn!(error = %err, "failed to persist theme");
        }
    }
}
