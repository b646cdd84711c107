//! The "shell" wizard: pick a nest, pick an egg, choose options, then migrate
//! the server onto the new egg.
//!
//! Selection is modelled as [`WizardState`]; every operator action is a
//! [`WizardEvent`] fed through [`MigrationWizard::transition`]. The network
//! side of a confirmed migration lives in [`run_migration`].

use anyhow::Result;
use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::api::PanelClientTrait;
use crate::error::http_error_to_human;
use crate::state::notifications::{FlashStore, SHELL_FLASH_KEY};
use crate::state::Generation;
use crate::types::{BackupSummary, CreateBackupRequest, Egg, Nest, ServerContext};

pub const MAX_DESCRIPTION_LENGTH: usize = 100;
pub const DEFAULT_BLANK_EGG: &str = "ab151eec-ab55-4de5-a162-e8ce854b3b60";
pub const DEFAULT_HIDDEN_NESTS: &[&str] = &["Pyro"];
pub const REINSTALL_STARTED_MESSAGE: &str =
    "Your servers egg has changed and the reinstallation process has begun.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOptions {
    /// Placeholder egg fresh servers are created with.
    pub blank_egg: String,
    /// Nests never offered as a migration target.
    pub hidden_nests: Vec<String>,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            blank_egg: DEFAULT_BLANK_EGG.to_string(),
            hidden_nests: DEFAULT_HIDDEN_NESTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Game,
    Software,
    Options,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Game, Step::Software, Step::Options];

    pub fn index(self) -> usize {
        match self {
            Step::Game => 0,
            Step::Software => 1,
            Step::Options => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Step> {
        Step::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Game => "Game",
            Step::Software => "Software",
            Step::Options => "Options & Variables",
        }
    }

    fn previous(self) -> Step {
        match self {
            Step::Game | Step::Software => Step::Game,
            Step::Options => Step::Software,
        }
    }
}

/// Everything the backend needs to migrate the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub server_uuid: String,
    pub egg_id: u64,
    pub nest_id: u64,
    pub egg_name: String,
    /// Set when a backup must be taken first.
    pub backup_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Succeeded { backup_created: bool },
    BackupFailed(String),
    EggChangeFailed { message: String, backup_created: bool },
    ReinstallFailed { message: String, backup_created: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    Browsing { step: Step },
    /// `nest` and `egg` index into the catalog and the nest's egg list.
    ConfirmingReinstall { step: Step, nest: usize, egg: usize },
    Applying { step: Step, plan: MigrationPlan },
}

impl WizardState {
    pub fn step(&self) -> Step {
        match self {
            WizardState::Browsing { step }
            | WizardState::ConfirmingReinstall { step, .. }
            | WizardState::Applying { step, .. } => *step,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    SelectNest(usize),
    SelectEgg(usize),
    GoToStep(Step),
    ToggleBackup,
    ToggleWipe,
    Confirm,
    Cancel,
    Applied(MigrationOutcome),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardSelection {
    pub nest: Option<usize>,
    pub egg: Option<usize>,
    pub should_backup: bool,
    /// Shown as a switch but never sent anywhere.
    pub wipe_data: bool,
}

#[derive(Debug, Clone, Default)]
struct ServerFacts {
    uuid: String,
    current_egg: String,
    backup_limit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptionView<'a> {
    pub text: &'a str,
    pub truncated: bool,
    pub toggle: Option<&'static str>,
}

/// Splits a description into what is shown and the expand/collapse label.
pub fn describe(description: &str, expanded: bool) -> DescriptionView<'_> {
    let is_long = description.chars().count() > MAX_DESCRIPTION_LENGTH;
    if is_long && !expanded {
        let cut = description
            .char_indices()
            .nth(MAX_DESCRIPTION_LENGTH)
            .map_or(description.len(), |(i, _)| i);
        DescriptionView {
            text: &description[..cut],
            truncated: true,
            toggle: Some("Show More"),
        }
    } else {
        DescriptionView {
            text: description,
            truncated: false,
            toggle: is_long.then_some("..Show Less"),
        }
    }
}

pub fn backup_name_for(egg_name: &str, now: DateTime<Local>) -> String {
    format!(
        "{} Migration - {}",
        egg_name,
        now.format("%-m/%-d/%Y, %-I:%M:%S %p")
    )
}

pub struct MigrationWizard {
    pub options: ShellOptions,
    pub state: WizardState,
    pub selection: WizardSelection,
    pub catalog: Option<Vec<Nest>>,
    pub backup_summary: Option<BackupSummary>,
    /// The "Change Egg" panel is collapsed until the operator opens it.
    pub revealed: bool,
    /// Cursor over whatever the current step lists.
    pub cursor: usize,
    pub last_outcome: Option<MigrationOutcome>,
    expanded: Vec<bool>,
    server: ServerFacts,
    generation: Generation,
    mounted: bool,
}

impl MigrationWizard {
    pub fn new(options: ShellOptions) -> Self {
        Self {
            options,
            state: WizardState::Browsing { step: Step::Game },
            selection: WizardSelection::default(),
            catalog: None,
            backup_summary: None,
            revealed: false,
            cursor: 0,
            last_outcome: None,
            expanded: Vec::new(),
            server: ServerFacts::default(),
            generation: Generation::default(),
            mounted: false,
        }
    }

    /// Resets all transient state for a fresh visit and returns the generation
    /// the catalog and backup requests must be tagged with.
    pub fn mount(&mut self, server: &ServerContext, flashes: &mut FlashStore) -> Generation {
        flashes.clear(SHELL_FLASH_KEY);
        self.state = WizardState::Browsing { step: Step::Game };
        self.selection = WizardSelection::default();
        self.catalog = None;
        self.backup_summary = None;
        self.revealed = false;
        self.cursor = 0;
        self.last_outcome = None;
        self.expanded.clear();
        self.server = ServerFacts {
            uuid: server.uuid.clone(),
            current_egg: server.egg.clone(),
            backup_limit: server.feature_limits.backups,
        };
        self.generation = self.generation.next();
        self.mounted = true;
        self.enforce_backup_quota();
        self.generation
    }

    pub fn unmount(&mut self) {
        if self.mounted {
            self.generation = self.generation.next();
            self.mounted = false;
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    fn accepts(&self, generation: Generation) -> bool {
        self.mounted && generation == self.generation
    }

    pub fn apply_catalog(
        &mut self,
        generation: Generation,
        result: Result<Vec<Nest>>,
        flashes: &mut FlashStore,
    ) -> bool {
        if !self.accepts(generation) {
            debug!(?generation, "dropping stale nest catalog");
            return false;
        }
        match result {
            Ok(nests) => {
                info!(nests = nests.len(), "nest catalog loaded");
                self.catalog = Some(nests);
            }
            Err(e) => {
                error!("failed to load nests: {e:#}");
                flashes.add_error(SHELL_FLASH_KEY, http_error_to_human(&e));
            }
        }
        true
    }

    pub fn apply_backup_summary(
        &mut self,
        generation: Generation,
        result: Result<BackupSummary>,
        flashes: &mut FlashStore,
    ) -> bool {
        if !self.accepts(generation) {
            debug!(?generation, "dropping stale backup summary");
            return false;
        }
        match result {
            Ok(summary) => {
                self.backup_summary = Some(summary);
                self.enforce_backup_quota();
            }
            Err(e) => {
                error!("failed to load backup summary: {e:#}");
                flashes.add_error(SHELL_FLASH_KEY, http_error_to_human(&e));
            }
        }
        true
    }

    /// Applies one operator action. Returns a plan when the action confirmed a migration.
    pub fn transition(&mut self, event: WizardEvent) -> Option<MigrationPlan> {
        match (self.state.clone(), event) {
            (WizardState::Browsing { step: Step::Game }, WizardEvent::SelectNest(nest)) => {
                if !self.visible_nests().contains(&nest) {
                    debug!(nest, "ignoring selection of unknown nest");
                    return None;
                }
                self.selection.nest = Some(nest);
                self.selection.egg = None;
                self.expanded.clear();
                self.go_to(Step::Software);
                None
            }
            (WizardState::Browsing { step: Step::Software }, WizardEvent::SelectEgg(egg)) => {
                let nest = self.selection.nest?;
                if !self.visible_eggs().contains(&egg) {
                    debug!(egg, "ignoring selection of unknown egg");
                    return None;
                }
                self.selection.egg = Some(egg);
                self.state = WizardState::ConfirmingReinstall {
                    step: Step::Software,
                    nest,
                    egg,
                };
                None
            }
            (WizardState::Browsing { .. }, WizardEvent::GoToStep(step)) => {
                if step == Step::Options && !self.options_available() {
                    debug!("options step unavailable on the blank egg");
                    return None;
                }
                self.go_to(step);
                None
            }
            (WizardState::Browsing { .. }, WizardEvent::ToggleBackup) => {
                self.selection.should_backup = !self.selection.should_backup;
                self.enforce_backup_quota();
                None
            }
            (WizardState::Browsing { .. }, WizardEvent::ToggleWipe) => {
                self.selection.wipe_data = !self.selection.wipe_data;
                None
            }
            (WizardState::ConfirmingReinstall { step, nest, egg }, WizardEvent::Confirm) => {
                let plan = self.plan_for(nest, egg, Local::now())?;
                info!(
                    egg = %plan.egg_name,
                    egg_id = plan.egg_id,
                    nest_id = plan.nest_id,
                    backup = plan.backup_name.is_some(),
                    "starting egg migration"
                );
                self.state = WizardState::Applying {
                    step,
                    plan: plan.clone(),
                };
                Some(plan)
            }
            (WizardState::ConfirmingReinstall { step, .. }, WizardEvent::Cancel) => {
                self.state = WizardState::Browsing { step };
                None
            }
            (WizardState::Applying { step, .. }, WizardEvent::Applied(outcome)) => {
                self.last_outcome = Some(outcome);
                self.state = WizardState::Browsing { step };
                None
            }
            (state, event) => {
                debug!(?state, ?event, "ignoring wizard event");
                None
            }
        }
    }

    fn go_to(&mut self, step: Step) {
        self.state = WizardState::Browsing { step };
        self.cursor = 0;
    }

    /// Steps back one page; used by Esc while browsing.
    pub fn back(&mut self) {
        if let WizardState::Browsing { step } = self.state {
            self.go_to(step.previous());
        }
    }

    /// Only the options step is gated on the blank egg; game and software stay
    /// reachable so a fresh server can still pick its first egg.
    pub fn options_available(&self) -> bool {
        self.server.current_egg != self.options.blank_egg
    }

    pub fn backup_quota_exhausted(&self) -> bool {
        let limit = self.server.backup_limit;
        limit <= 0
            || self
                .backup_summary
                .is_some_and(|summary| summary.backup_count >= limit)
    }

    fn enforce_backup_quota(&mut self) {
        if self.selection.should_backup && self.backup_quota_exhausted() {
            debug!("backup quota exhausted, disabling pre-migration backup");
            self.selection.should_backup = false;
        }
    }

    /// Catalog indices of the nests offered at step 0.
    pub fn visible_nests(&self) -> Vec<usize> {
        self.catalog
            .iter()
            .flatten()
            .enumerate()
            .filter(|(_, nest)| !self.options.hidden_nests.contains(&nest.name))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn selected_nest(&self) -> Option<&Nest> {
        let index = self.selection.nest?;
        self.catalog.as_ref()?.get(index)
    }

    pub fn selected_egg(&self) -> Option<&Egg> {
        self.selected_nest()?.eggs.get(self.selection.egg?)
    }

    /// Indices into the selected nest's eggs, without the egg already installed.
    pub fn visible_eggs(&self) -> Vec<usize> {
        self.selected_nest()
            .map(|nest| {
                nest.eggs
                    .iter()
                    .enumerate()
                    .filter(|(_, egg)| egg.uuid != self.server.current_egg)
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn current_egg_name(&self) -> Option<&str> {
        self.catalog
            .iter()
            .flatten()
            .flat_map(|nest| nest.eggs.iter())
            .find(|egg| egg.uuid == self.server.current_egg)
            .map(|egg| egg.name.as_str())
    }

    pub fn is_expanded(&self, egg: usize) -> bool {
        self.expanded.get(egg).copied().unwrap_or(false)
    }

    pub fn toggle_description(&mut self, egg: usize) {
        if self.expanded.len() <= egg {
            self.expanded.resize(egg + 1, false);
        }
        self.expanded[egg] = !self.expanded[egg];
    }

    /// Egg id sent to the backend. Prefers the backend's own id; older panels
    /// only expose the egg's 1-based position in the flattened catalog.
    pub fn resolve_egg_id(&self, nest: usize, egg: usize) -> Option<u64> {
        let catalog = self.catalog.as_ref()?;
        let target = catalog.get(nest)?.eggs.get(egg)?;
        if let Some(id) = target.id {
            return Some(id);
        }
        let position = catalog
            .iter()
            .flat_map(|n| n.eggs.iter())
            .position(|e| e.uuid == target.uuid)?;
        warn!(
            egg = %target.uuid,
            position,
            "egg has no id, falling back to its catalog position"
        );
        Some(position as u64 + 1)
    }

    pub fn plan_for(&self, nest: usize, egg: usize, now: DateTime<Local>) -> Option<MigrationPlan> {
        let nest_ref = self.catalog.as_ref()?.get(nest)?;
        let egg_ref = nest_ref.eggs.get(egg)?;
        Some(MigrationPlan {
            server_uuid: self.server.uuid.clone(),
            egg_id: self.resolve_egg_id(nest, egg)?,
            nest_id: nest_ref.id,
            egg_name: egg_ref.name.clone(),
            backup_name: self
                .selection
                .should_backup
                .then(|| backup_name_for(&egg_ref.name, now)),
        })
    }

    /// Number of rows the cursor can move over on the current step.
    fn cursor_len(&self) -> usize {
        match self.state.step() {
            Step::Game => self.visible_nests().len(),
            Step::Software => self.visible_eggs().len(),
            Step::Options => 2,
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor < self.cursor_len().saturating_sub(1) {
            self.cursor += 1;
        }
    }

    /// Event for pressing Enter on the row under the cursor.
    pub fn event_at_cursor(&self) -> Option<WizardEvent> {
        match self.state {
            WizardState::Browsing { step: Step::Game } => self
                .visible_nests()
                .get(self.cursor)
                .map(|&nest| WizardEvent::SelectNest(nest)),
            WizardState::Browsing { step: Step::Software } => self
                .visible_eggs()
                .get(self.cursor)
                .map(|&egg| WizardEvent::SelectEgg(egg)),
            WizardState::Browsing { step: Step::Options } => Some(if self.cursor == 0 {
                WizardEvent::ToggleBackup
            } else {
                WizardEvent::ToggleWipe
            }),
            WizardState::ConfirmingReinstall { .. } => Some(WizardEvent::Confirm),
            WizardState::Applying { .. } => None,
        }
    }

    /// Egg index under the cursor on the software step.
    pub fn egg_at_cursor(&self) -> Option<usize> {
        match self.state {
            WizardState::Browsing { step: Step::Software } => {
                self.visible_eggs().get(self.cursor).copied()
            }
            _ => None,
        }
    }
}

/// Runs a confirmed migration: optional backup, then egg change, then reinstall.
///
/// Each call only starts once the previous one succeeded. A backup that was
/// created is kept even when a later call fails. In dry-run mode nothing is sent.
pub async fn run_migration(
    client: &dyn PanelClientTrait,
    plan: &MigrationPlan,
    dry_run: bool,
) -> MigrationOutcome {
    if dry_run {
        info!(?plan, "dry run: skipping backup, egg change and reinstall");
        return MigrationOutcome::Succeeded {
            backup_created: plan.backup_name.is_some(),
        };
    }

    let mut backup_created = false;
    if let Some(name) = &plan.backup_name {
        let request = CreateBackupRequest {
            name: name.clone(),
            is_locked: false,
        };
        if let Err(e) = client.create_backup(&plan.server_uuid, &request).await {
            error!("pre-migration backup failed: {e:#}");
            return MigrationOutcome::BackupFailed(http_error_to_human(&e));
        }
        info!(backup = %name, "pre-migration backup requested");
        backup_created = true;
    }

    if let Err(e) = client
        .set_egg(&plan.server_uuid, plan.egg_id, plan.nest_id)
        .await
    {
        error!("egg change failed: {e:#}");
        return MigrationOutcome::EggChangeFailed {
            message: http_error_to_human(&e),
            backup_created,
        };
    }

    if let Err(e) = client.reinstall(&plan.server_uuid).await {
        error!("reinstall failed: {e:#}");
        return MigrationOutcome::ReinstallFailed {
            message: http_error_to_human(&e),
            backup_created,
        };
    }

    info!(uuid = %plan.server_uuid, "reinstall started");
    MigrationOutcome::Succeeded { backup_created }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockPanelClientTrait;
    use crate::types::FeatureLimits;
    use anyhow::anyhow;
    use chrono::TimeZone;

    fn egg(id: Option<u64>, uuid: &str, name: &str) -> Egg {
        Egg {
            id,
            uuid: uuid.to_string(),
            name: name.to_string(),
            description: String::new(),
        }
    }

    fn nest(id: u64, name: &str, eggs: Vec<Egg>) -> Nest {
        Nest {
            id,
            uuid: format!("nest-{id}"),
            name: name.to_string(),
            description: String::new(),
            eggs,
        }
    }

    fn server(egg: &str, backups: i64) -> ServerContext {
        ServerContext {
            id: 1,
            identifier: "abcd1234".to_string(),
            uuid: "abcd1234-0000".to_string(),
            name: "survival".to_string(),
            egg: egg.to_string(),
            feature_limits: FeatureLimits {
                databases: 0,
                allocations: 1,
                backups,
            },
        }
    }

    fn mounted_wizard(current_egg: &str, backups: i64, nests: Vec<Nest>) -> MigrationWizard {
        let mut wizard = MigrationWizard::new(ShellOptions::default());
        let mut flashes = FlashStore::new();
        let generation = wizard.mount(&server(current_egg, backups), &mut flashes);
        wizard.apply_catalog(generation, Ok(nests), &mut flashes);
        wizard
    }

    fn catalog() -> Vec<Nest> {
        vec![
            nest(
                5,
                "Minecraft",
                vec![egg(None, "e1", "Vanilla"), egg(None, "e2", "Paper")],
            ),
            nest(6, "Pyro", vec![egg(None, "e3", "Internal")]),
            nest(8, "Rust", vec![egg(None, "e4", "Rust"), egg(Some(42), "e5", "Oxide")]),
        ]
    }

    #[test]
    fn test_describe_truncates_long_text() {
        let long = "x".repeat(150);
        let collapsed = describe(&long, false);
        assert_eq!(collapsed.text.len(), 100);
        assert!(collapsed.truncated);
        assert_eq!(collapsed.toggle, Some("Show More"));

        let expanded = describe(&long, true);
        assert_eq!(expanded.text.len(), 150);
        assert_eq!(expanded.toggle, Some("..Show Less"));

        let short = describe("short", false);
        assert_eq!(short.text, "short");
        assert_eq!(short.toggle, None);
    }

    #[test]
    fn test_describe_cuts_on_char_boundary() {
        let long = "é".repeat(120);
        let collapsed = describe(&long, false);
        assert_eq!(collapsed.text.chars().count(), 100);
    }

    #[test]
    fn test_description_toggle_is_per_index() {
        let mut wizard = mounted_wizard("other", 2, catalog());
        wizard.toggle_description(1);
        assert!(wizard.is_expanded(1));
        assert!(!wizard.is_expanded(0));
        wizard.toggle_description(1);
        assert!(!wizard.is_expanded(1));
    }

    #[test]
    fn test_hidden_nests_are_not_offered() {
        let wizard = mounted_wizard("other", 2, catalog());
        assert_eq!(wizard.visible_nests(), vec![0, 2]);

        let mut wizard = wizard;
        assert_eq!(wizard.transition(WizardEvent::SelectNest(1)), None);
        assert_eq!(wizard.selection.nest, None);
    }

    #[test]
    fn test_selecting_nest_clears_egg_and_advances() {
        let mut wizard = mounted_wizard("other", 2, catalog());
        wizard.transition(WizardEvent::SelectNest(0));
        wizard.transition(WizardEvent::SelectEgg(1));
        wizard.transition(WizardEvent::Cancel);
        assert_eq!(wizard.selection.egg, Some(1));

        wizard.transition(WizardEvent::GoToStep(Step::Game));
        wizard.transition(WizardEvent::SelectNest(2));

        assert_eq!(wizard.selection.nest, Some(2));
        assert_eq!(wizard.selection.egg, None);
        assert_eq!(wizard.state, WizardState::Browsing { step: Step::Software });
    }

    #[test]
    fn test_installed_egg_is_excluded() {
        let mut wizard = mounted_wizard("e1", 2, catalog());
        wizard.transition(WizardEvent::SelectNest(0));
        assert_eq!(wizard.visible_eggs(), vec![1]);
        assert_eq!(wizard.current_egg_name(), Some("Vanilla"));

        wizard.transition(WizardEvent::SelectEgg(0));
        assert_eq!(wizard.state, WizardState::Browsing { step: Step::Software });
    }

    #[test]
    fn test_confirm_only_opens_from_egg_selection() {
        let mut wizard = mounted_wizard("other", 2, catalog());
        assert_eq!(wizard.transition(WizardEvent::Confirm), None);
        assert_eq!(wizard.transition(WizardEvent::SelectEgg(0)), None);
        assert!(matches!(wizard.state, WizardState::Browsing { .. }));

        wizard.transition(WizardEvent::SelectNest(0));
        wizard.transition(WizardEvent::SelectEgg(0));
        assert_eq!(
            wizard.state,
            WizardState::ConfirmingReinstall {
                step: Step::Software,
                nest: 0,
                egg: 0
            }
        );
    }

    #[test]
    fn test_cancel_returns_to_same_step() {
        let mut wizard = mounted_wizard("other", 2, catalog());
        wizard.transition(WizardEvent::SelectNest(0));
        wizard.transition(WizardEvent::SelectEgg(0));

        assert_eq!(wizard.transition(WizardEvent::Cancel), None);
        assert_eq!(wizard.state, WizardState::Browsing { step: Step::Software });
    }

    #[test]
    fn test_options_step_hidden_on_blank_egg() {
        let mut wizard = mounted_wizard(DEFAULT_BLANK_EGG, 2, catalog());
        wizard.transition(WizardEvent::GoToStep(Step::Options));
        assert_eq!(wizard.state.step(), Step::Game);

        let mut wizard = mounted_wizard("other", 2, catalog());
        wizard.transition(WizardEvent::GoToStep(Step::Options));
        assert_eq!(wizard.state.step(), Step::Options);
    }

    #[test]
    fn test_backup_quota_forces_backup_off() {
        let mut wizard = mounted_wizard("other", 2, catalog());
        wizard.transition(WizardEvent::ToggleBackup);
        assert!(wizard.selection.should_backup);

        let generation = wizard.generation();
        wizard.apply_backup_summary(
            generation,
            Ok(BackupSummary { backup_count: 2 }),
            &mut FlashStore::new(),
        );
        assert!(!wizard.selection.should_backup);

        wizard.transition(WizardEvent::ToggleBackup);
        assert!(!wizard.selection.should_backup);
    }

    #[test]
    fn test_zero_backup_limit_never_backs_up() {
        let mut wizard = mounted_wizard("other", 0, catalog());
        wizard.transition(WizardEvent::ToggleBackup);
        assert!(!wizard.selection.should_backup);
        assert!(wizard.backup_quota_exhausted());
    }

    #[test]
    fn test_wipe_toggle_is_local_only() {
        let mut wizard = mounted_wizard("other", 2, catalog());
        wizard.transition(WizardEvent::ToggleWipe);
        assert!(wizard.selection.wipe_data);
    }

    #[test]
    fn test_egg_id_prefers_backend_id() {
        let wizard = mounted_wizard("other", 2, catalog());
        assert_eq!(wizard.resolve_egg_id(2, 1), Some(42));
        // Flattened position of "Rust" is 4 (Vanilla, Paper, Internal, Rust).
        assert_eq!(wizard.resolve_egg_id(2, 0), Some(4));
        assert_eq!(wizard.resolve_egg_id(0, 0), Some(1));
    }

    #[test]
    fn test_confirm_builds_plan() {
        let mut wizard = mounted_wizard("other", 3, catalog());
        wizard.transition(WizardEvent::ToggleBackup);
        wizard.transition(WizardEvent::SelectNest(0));
        wizard.transition(WizardEvent::SelectEgg(1));

        let plan = wizard.transition(WizardEvent::Confirm).unwrap();

        assert_eq!(plan.server_uuid, "abcd1234-0000");
        assert_eq!(plan.egg_id, 2);
        assert_eq!(plan.nest_id, 5);
        assert!(plan
            .backup_name
            .as_deref()
            .unwrap()
            .starts_with("Paper Migration - "));
        assert!(matches!(wizard.state, WizardState::Applying { .. }));

        wizard.transition(WizardEvent::Applied(MigrationOutcome::Succeeded {
            backup_created: true,
        }));
        assert_eq!(wizard.state, WizardState::Browsing { step: Step::Software });
    }

    #[test]
    fn test_backup_name_format() {
        let now = Local.with_ymd_and_hms(2026, 10, 19, 15, 4, 5).unwrap();
        assert_eq!(
            backup_name_for("Vanilla", now),
            "Vanilla Migration - 10/19/2026, 3:04:05 PM"
        );
    }

    #[test]
    fn test_cursor_enter_maps_to_events() {
        let mut wizard = mounted_wizard("other", 2, catalog());
        wizard.move_cursor_down();
        assert_eq!(wizard.event_at_cursor(), Some(WizardEvent::SelectNest(2)));
        wizard.move_cursor_down();
        assert_eq!(wizard.cursor, 1);
    }

    fn plan(backup: bool) -> MigrationPlan {
        MigrationPlan {
            server_uuid: "uuid-1".to_string(),
            egg_id: 1,
            nest_id: 5,
            egg_name: "Vanilla".to_string(),
            backup_name: backup.then(|| "Vanilla Migration - now".to_string()),
        }
    }

    #[tokio::test]
    async fn test_run_without_backup_skips_backup_call() {
        let mut client = MockPanelClientTrait::new();
        client.expect_create_backup().times(0);
        client
            .expect_set_egg()
            .withf(|uuid, egg_id, nest_id| uuid == "uuid-1" && *egg_id == 1 && *nest_id == 5)
            .times(1)
            .returning(|_, _, _| Ok(()));
        client
            .expect_reinstall()
            .withf(|uuid| uuid == "uuid-1")
            .times(1)
            .returning(|_| Ok(()));

        let outcome = run_migration(&client, &plan(false), false).await;
        assert_eq!(
            outcome,
            MigrationOutcome::Succeeded {
                backup_created: false
            }
        );
    }

    #[tokio::test]
    async fn test_backup_runs_before_egg_change_and_reinstall() {
        let mut client = MockPanelClientTrait::new();
        let mut seq = mockall::Sequence::new();
        client
            .expect_create_backup()
            .withf(|uuid, req| uuid == "uuid-1" && req.name == "Vanilla Migration - now")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        client
            .expect_set_egg()
            .withf(|uuid, egg_id, nest_id| uuid == "uuid-1" && *egg_id == 1 && *nest_id == 5)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        client
            .expect_reinstall()
            .withf(|uuid| uuid == "uuid-1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let outcome = run_migration(&client, &plan(true), false).await;
        assert_eq!(
            outcome,
            MigrationOutcome::Succeeded {
                backup_created: true
            }
        );
    }

    #[tokio::test]
    async fn test_backup_failure_stops_migration() {
        let mut client = MockPanelClientTrait::new();
        client
            .expect_create_backup()
            .times(1)
            .returning(|_, _| Err(anyhow!("Backup limit reached.")));
        client.expect_set_egg().times(0);
        client.expect_reinstall().times(0);

        let outcome = run_migration(&client, &plan(true), false).await;
        assert_eq!(
            outcome,
            MigrationOutcome::BackupFailed("Backup limit reached.".to_string())
        );
    }

    #[tokio::test]
    async fn test_reinstall_failure_keeps_backup() {
        let mut client = MockPanelClientTrait::new();
        client
            .expect_create_backup()
            .withf(|uuid, req| uuid == "uuid-1" && !req.is_locked)
            .times(1)
            .returning(|_, _| Ok(()));
        client.expect_set_egg().times(1).returning(|_, _, _| Ok(()));
        client
            .expect_reinstall()
            .times(1)
            .returning(|_| Err(anyhow!("server is busy")));

        let outcome = run_migration(&client, &plan(true), false).await;
        assert_eq!(
            outcome,
            MigrationOutcome::ReinstallFailed {
                message: "server is busy".to_string(),
                backup_created: true
            }
        );
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        let client = MockPanelClientTrait::new();
        let outcome = run_migration(&client, &plan(true), true).await;
        assert_eq!(
            outcome,
            MigrationOutcome::Succeeded {
                backup_created: true
            }
        );
    }
}
