use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::types::{
    ApiObject, BackupListResponse, BackupSummary, CreateBackupRequest, ListOrArray, Nest,
    NestAttributes, Schedule, ScheduleAttributes, ServerAttributes, ServerContext, SetEggRequest,
};

#[mockall::automock]
#[async_trait]
pub trait PanelClientTrait: Send + Sync {
    async fn get_server(&self, uuid: &str) -> Result<ServerContext>;
    async fn list_schedules(&self, uuid: &str) -> Result<Vec<Schedule>>;
    async fn list_nests(&self) -> Result<Vec<Nest>>;
    async fn get_backup_summary(&self, uuid: &str) -> Result<BackupSummary>;
    async fn create_backup(&self, uuid: &str, request: &CreateBackupRequest) -> Result<()>;
    async fn set_egg(&self, uuid: &str, egg_id: u64, nest_id: u64) -> Result<()>;
    async fn reinstall(&self, uuid: &str) -> Result<()>;
}

pub struct PanelClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PanelClient {
    pub fn new(panel_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/api/client", panel_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<String> {
        let response = self.authorized(request).send().await.map_err(ApiError::from)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::from)?;

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &body).into());
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let body = self.send(self.client.get(self.url(path))).await?;
        Ok(serde_json::from_str(&body).map_err(ApiError::from)?)
    }
}

#[async_trait]
impl PanelClientTrait for PanelClient {
    async fn get_server(&self, uuid: &str) -> Result<ServerContext> {
        let server: ApiObject<ServerAttributes> =
            self.get_json(&format!("servers/{}", uuid)).await?;
        Ok(server.attributes.into())
    }

    async fn list_schedules(&self, uuid: &str) -> Result<Vec<Schedule>> {
        let list: ListOrArray<ScheduleAttributes> =
            self.get_json(&format!("servers/{}/schedules", uuid)).await?;
        Ok(list.into_items().into_iter().map(Schedule::from).collect())
    }

    async fn list_nests(&self) -> Result<Vec<Nest>> {
        let list: ListOrArray<NestAttributes> = self.get_json("nests").await?;
        Ok(list.into_items().into_iter().map(Nest::from).collect())
    }

    async fn get_backup_summary(&self, uuid: &str) -> Result<BackupSummary> {
        let list: BackupListResponse = self.get_json(&format!("servers/{}/backups", uuid)).await?;
        Ok(BackupSummary {
            backup_count: list.meta.backup_count,
        })
    }

    async fn create_backup(&self, uuid: &str, request: &CreateBackupRequest) -> Result<()> {
        debug!(uuid, name = %request.name, "POST backups");
        self.send(
            self.client
                .post(self.url(&format!("servers/{}/backups", uuid)))
                .json(request),
        )
        .await?;
        Ok(())
    }

    async fn set_egg(&self, uuid: &str, egg_id: u64, nest_id: u64) -> Result<()> {
        debug!(uuid, egg_id, nest_id, "PUT settings/egg");
        self.send(
            self.client
                .put(self.url(&format!("servers/{}/settings/egg", uuid)))
                .json(&SetEggRequest { egg_id, nest_id }),
        )
        .await?;
        Ok(())
    }

    async fn reinstall(&self, uuid: &str) -> Result<()> {
        debug!(uuid, "POST settings/reinstall");
        self.send(
            self.client
                .post(self.url(&format!("servers/{}/settings/reinstall", uuid))),
        )
        .await?;
        Ok(())
    }
}
