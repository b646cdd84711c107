use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use crate::api::PanelClientTrait;
use crate::error::http_error_to_human;
use crate::state::migration_wizard::{
    run_migration, MigrationOutcome, MigrationPlan, MigrationWizard, ShellOptions, WizardEvent,
    WizardState, REINSTALL_STARTED_MESSAGE,
};
use crate::state::notifications::{FlashStore, ToastQueue, SHELL_FLASH_KEY};
use crate::state::schedule_list::ScheduleListView;
use crate::state::Generation;
use crate::types::{AppState, BackupSummary, FlashKind, Nest, Schedule, Screen, ServerContext};

/// Results of background requests, tagged with the mount they were started for.
#[derive(Debug)]
pub enum AppEvent {
    SchedulesLoaded {
        generation: Generation,
        result: Result<Vec<Schedule>>,
    },
    NestsLoaded {
        generation: Generation,
        result: Result<Vec<Nest>>,
    },
    BackupSummaryLoaded {
        generation: Generation,
        result: Result<BackupSummary>,
    },
    MigrationFinished {
        generation: Generation,
        outcome: MigrationOutcome,
    },
}

pub struct App {
    pub state: AppState,
    pub screen: Screen,
    pub dry_run_mode: bool,
    pub client: Arc<dyn PanelClientTrait>,
    pub server_uuid: String,
    pub server: Option<ServerContext>,
    pub schedules: ScheduleListView,
    pub wizard: MigrationWizard,
    pub flashes: FlashStore,
    pub toasts: ToastQueue,
    pub show_help: bool,
    pub should_quit: bool,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(
        client: Arc<dyn PanelClientTrait>,
        server_uuid: impl Into<String>,
        shell: ShellOptions,
        dry_run_mode: bool,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            state: AppState::CheckingServer,
            screen: Screen::Schedules,
            dry_run_mode,
            client,
            server_uuid: server_uuid.into(),
            server: None,
            schedules: ScheduleListView::new(),
            wizard: MigrationWizard::new(shell),
            flashes: FlashStore::new(),
            toasts: ToastQueue::new(),
            show_help: false,
            should_quit: false,
            events_tx,
            events_rx,
        }
    }

    /// Loads the server context, then mounts the first screen.
    pub async fn initialize(&mut self) -> Result<()> {
        self.state = AppState::CheckingServer;

        match self.client.get_server(&self.server_uuid).await {
            Ok(server) => {
                info!(uuid = %server.uuid, name = %server.name, "server loaded");
                self.server = Some(server);
                self.state = AppState::Ready;
                self.mount_current_screen();
            }
            Err(e) => {
                error!("failed to load server {}: {e:#}", self.server_uuid);
                self.state = AppState::Error(http_error_to_human(&e));
            }
        }

        Ok(())
    }

    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            // The receiver only goes away when the app is shutting down.
            let _ = tx.send(request.await);
        });
    }

    /// Tears down whichever view is not shown and (re)mounts the one that is.
    pub fn mount_current_screen(&mut self) {
        let Some(server) = self.server.clone() else {
            return;
        };

        match self.screen {
            Screen::Schedules => {
                self.wizard.unmount();
                let generation = self.schedules.mount(&mut self.flashes);
                let client = Arc::clone(&self.client);
                self.spawn_request(async move {
                    AppEvent::SchedulesLoaded {
                        generation,
                        result: client.list_schedules(&server.uuid).await,
                    }
                });
            }
            Screen::Shell => {
                self.schedules.unmount();
                let generation = self.wizard.mount(&server, &mut self.flashes);

                let client = Arc::clone(&self.client);
                self.spawn_request(async move {
                    AppEvent::NestsLoaded {
                        generation,
                        result: client.list_nests().await,
                    }
                });

                let client = Arc::clone(&self.client);
                self.spawn_request(async move {
                    AppEvent::BackupSummaryLoaded {
                        generation,
                        result: client.get_backup_summary(&server.uuid).await,
                    }
                });
            }
        }
    }

    pub fn switch_screen(&mut self, screen: Screen) {
        if self.screen != screen {
            debug!(from = ?self.screen, to = ?screen, "switching screen");
            self.screen = screen;
        }
        self.mount_current_screen();
    }

    pub fn next_screen(&mut self) {
        let next = match self.screen {
            Screen::Schedules => Screen::Shell,
            Screen::Shell => Screen::Schedules,
        };
        self.switch_screen(next);
    }

    /// Feeds an operator action to the wizard and starts the migration if it was confirmed.
    pub fn wizard_event(&mut self, event: WizardEvent) {
        if let Some(plan) = self.wizard.transition(event) {
            self.start_migration(plan);
        }
    }

    fn start_migration(&mut self, plan: MigrationPlan) {
        self.flashes.clear(SHELL_FLASH_KEY);
        let generation = self.wizard.generation();
        let client = Arc::clone(&self.client);
        let dry_run = self.dry_run_mode;
        self.spawn_request(async move {
            AppEvent::MigrationFinished {
                generation,
                outcome: run_migration(client.as_ref(), &plan, dry_run).await,
            }
        });
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SchedulesLoaded { generation, result } => {
                self.schedules
                    .apply_loaded(generation, result, &mut self.flashes);
            }
            AppEvent::NestsLoaded { generation, result } => {
                self.wizard
                    .apply_catalog(generation, result, &mut self.flashes);
            }
            AppEvent::BackupSummaryLoaded { generation, result } => {
                self.wizard
                    .apply_backup_summary(generation, result, &mut self.flashes);
            }
            AppEvent::MigrationFinished {
                generation,
                outcome,
            } => {
                if !self.wizard.is_mounted() || generation != self.wizard.generation() {
                    debug!(?outcome, "migration finished after the shell was closed");
                    return;
                }
                self.report_migration(&outcome);
                self.wizard.transition(WizardEvent::Applied(outcome));
            }
        }
    }

    fn report_migration(&mut self, outcome: &MigrationOutcome) {
        match outcome {
            MigrationOutcome::Succeeded { .. } => {
                self.flashes
                    .add(SHELL_FLASH_KEY, FlashKind::Success, REINSTALL_STARTED_MESSAGE);
            }
            MigrationOutcome::BackupFailed(message) => self.toasts.error(message.clone()),
            MigrationOutcome::EggChangeFailed { message, .. }
            | MigrationOutcome::ReinstallFailed { message, .. } => {
                self.flashes.add_error(SHELL_FLASH_KEY, message.clone());
            }
        }
    }

    /// Applies every result that has already arrived, without waiting.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    /// Waits for the next background result and applies it.
    pub async fn process_next_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// True between confirming a migration and receiving its outcome. Remounting
    /// the shell then would orphan the result, so screen switches and reloads wait.
    pub fn migration_in_flight(&self) -> bool {
        self.wizard.is_mounted() && matches!(self.wizard.state, WizardState::Applying { .. })
    }

    pub fn tick(&mut self) {
        self.toasts.prune(Instant::now());
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn move_selection_up(&mut self) {
        match self.screen {
            Screen::Schedules => self.schedules.move_selection_up(),
            Screen::Shell => self.wizard.move_cursor_up(),
        }
    }

    pub fn move_selection_down(&mut self) {
        match self.screen {
            Screen::Schedules => self.schedules.move_selection_down(),
            Screen::Shell => self.wizard.move_cursor_down(),
        }
    }

    pub fn select_current_item(&mut self) {
        if self.screen != Screen::Shell {
            return;
        }
        if !self.wizard.revealed {
            self.wizard.revealed = true;
            return;
        }
        if let Some(event) = self.wizard.event_at_cursor() {
            self.wizard_event(event);
        }
    }
}
