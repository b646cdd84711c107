use anyhow::Result;
use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use tracing::{debug, error};

use crate::error::http_error_to_human;
use crate::state::notifications::{FlashStore, SCHEDULES_FLASH_KEY};
use crate::state::Generation;
use crate::types::Schedule;

/// One rendered line of the schedule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub id: u64,
    pub name: String,
    pub last_run: String,
    pub minute: String,
    pub hour: String,
    pub day_of_month: String,
    pub month: String,
    pub day_of_week: String,
    pub status: &'static str,
    pub is_active: bool,
}

impl ScheduleRow {
    pub fn from_schedule<Tz>(schedule: &Schedule, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            id: schedule.id,
            name: schedule.name.clone(),
            last_run: format_last_run(schedule.last_run_at, tz),
            minute: schedule.cron.minute.clone(),
            hour: schedule.cron.hour.clone(),
            day_of_month: schedule.cron.day_of_month.clone(),
            month: "*".to_string(),
            day_of_week: schedule.cron.day_of_week.clone(),
            status: if schedule.is_active { "Active" } else { "Inactive" },
            is_active: schedule.is_active,
        }
    }
}

/// `Oct 19th at 3:04pm`, or `never`.
pub fn format_last_run<Tz>(last_run_at: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match last_run_at {
        Some(ts) => {
            let local = ts.with_timezone(tz);
            format!(
                "{} {} at {}",
                local.format("%b"),
                ordinal(local.day()),
                local.format("%-I:%M%P")
            )
        }
        None => "never".to_string(),
    }
}

fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix}")
}

#[derive(Debug, Default)]
pub struct ScheduleListView {
    /// `None` while loading.
    pub schedules: Option<Vec<Schedule>>,
    pub selected_index: usize,
    generation: Generation,
    mounted: bool,
}

impl ScheduleListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, flashes: &mut FlashStore) -> Generation {
        flashes.clear(SCHEDULES_FLASH_KEY);
        self.schedules = None;
        self.selected_index = 0;
        self.generation = self.generation.next();
        self.mounted = true;
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

    /// Applies a finished fetch. Returns `false` when the result belongs to an earlier mount.
    pub fn apply_loaded(
        &mut self,
        generation: Generation,
        result: Result<Vec<Schedule>>,
        flashes: &mut FlashStore,
    ) -> bool {
        if !self.mounted || generation != self.generation {
            debug!(?generation, "dropping stale schedule list");
            return false;
        }

        match result {
            Ok(schedules) => {
                self.schedules = Some(schedules);
                self.selected_index = 0;
            }
            Err(e) => {
                error!("failed to load schedules: {e:#}");
                flashes.add_error(SCHEDULES_FLASH_KEY, http_error_to_human(&e));
            }
        }
        true
    }

    pub fn is_loading(&self) -> bool {
        self.schedules.is_none()
    }

    pub fn rows(&self) -> Vec<ScheduleRow> {
        self.rows_in(&Local)
    }

    pub fn rows_in<Tz>(&self, tz: &Tz) -> Vec<ScheduleRow>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        self.schedules
            .iter()
            .flatten()
            .map(|s| ScheduleRow::from_schedule(s, tz))
            .collect()
    }

    pub fn move_selection_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn move_selection_down(&mut self) {
        let len = self.schedules.as_ref().map_or(0, Vec::len);
        if self.selected_index < len.saturating_sub(1) {
            self.selected_index += 1;
        }
    }
}
