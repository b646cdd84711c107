use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSpec {
    pub minute: String,
    pub hour: String,
    pub day_of_month: String,
    pub day_of_week: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub id: u64,
    pub name: String,
    pub cron: CronSpec,
    pub is_active: bool,
    pub is_processing: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Egg {
    /// Stable id from the backend; older panels omit it.
    pub id: Option<u64>,
    pub uuid: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Nest {
    pub id: u64,
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub eggs: Vec<Egg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureLimits {
    pub databases: i64,
    pub allocations: i64,
    pub backups: i64,
}

/// The server every view operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerContext {
    pub id: u64,
    pub identifier: String,
    pub uuid: String,
    pub name: String,
    pub egg: String,
    pub feature_limits: FeatureLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupSummary {
    pub backup_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBackupRequest {
    pub name: String,
    pub is_locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetEggRequest {
    pub egg_id: u64,
    pub nest_id: u64,
}

// Wire shapes of the panel's client API.

#[derive(Debug, Deserialize)]
pub struct ApiObject<T> {
    pub attributes: T,
}

#[derive(Debug, Deserialize)]
pub struct ApiList<T> {
    pub data: Vec<ApiObject<T>>,
}

/// Some panel builds wrap lists in `{ "object": "list", "data": [...] }`, others return a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListOrArray<T> {
    List(ApiList<T>),
    Array(Vec<ApiObject<T>>),
}

impl<T> ListOrArray<T> {
    pub fn into_items(self) -> Vec<T> {
        let objects = match self {
            ListOrArray::List(list) => list.data,
            ListOrArray::Array(array) => array,
        };
        objects.into_iter().map(|o| o.attributes).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleAttributes {
    pub id: u64,
    pub name: String,
    pub cron: CronAttributes,
    pub is_active: bool,
    #[serde(default)]
    pub is_processing: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CronAttributes {
    pub minute: String,
    pub hour: String,
    pub day_of_month: String,
    pub day_of_week: String,
}

impl From<ScheduleAttributes> for Schedule {
    fn from(raw: ScheduleAttributes) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            cron: CronSpec {
                minute: raw.cron.minute,
                hour: raw.cron.hour,
                day_of_month: raw.cron.day_of_month,
                day_of_week: raw.cron.day_of_week,
            },
            is_active: raw.is_active,
            is_processing: raw.is_processing,
            last_run_at: raw.last_run_at,
            next_run_at: raw.next_run_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NestAttributes {
    pub id: u64,
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub relationships: NestRelationships,
}

#[derive(Debug, Deserialize)]
pub struct NestRelationships {
    pub eggs: ApiList<EggAttributes>,
}

#[derive(Debug, Deserialize)]
pub struct EggAttributes {
    #[serde(default)]
    pub id: Option<u64>,
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<NestAttributes> for Nest {
    fn from(raw: NestAttributes) -> Self {
        Self {
            id: raw.id,
            uuid: raw.uuid,
            name: raw.name,
            description: raw.description.unwrap_or_default(),
            eggs: raw
                .relationships
                .eggs
                .data
                .into_iter()
                .map(|egg| Egg {
                    id: egg.attributes.id,
                    uuid: egg.attributes.uuid,
                    name: egg.attributes.name,
                    description: egg.attributes.description.unwrap_or_default(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerAttributes {
    pub internal_id: u64,
    pub identifier: String,
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub egg: Option<String>,
    pub feature_limits: FeatureLimitAttributes,
}

#[derive(Debug, Deserialize)]
pub struct FeatureLimitAttributes {
    #[serde(default)]
    pub databases: Option<i64>,
    #[serde(default)]
    pub allocations: Option<i64>,
    #[serde(default)]
    pub backups: Option<i64>,
}

impl From<ServerAttributes> for ServerContext {
    fn from(raw: ServerAttributes) -> Self {
        Self {
            id: raw.internal_id,
            identifier: raw.identifier,
            uuid: raw.uuid,
            name: raw.name,
            egg: raw.egg.unwrap_or_default(),
            feature_limits: FeatureLimits {
                databases: raw.feature_limits.databases.unwrap_or(0),
                allocations: raw.feature_limits.allocations.unwrap_or(0),
                backups: raw.feature_limits.backups.unwrap_or(0),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BackupListResponse {
    pub meta: BackupListMeta,
}

#[derive(Debug, Deserialize)]
pub struct BackupListMeta {
    pub backup_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Schedules,
    Shell,
}

impl Screen {
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Schedules => "Schedules",
            Screen::Shell => "Shell",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    CheckingServer,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub key: String,
    pub kind: FlashKind,
    pub message: String,
}
