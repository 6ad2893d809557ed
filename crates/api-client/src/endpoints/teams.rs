//! Team endpoints

use crate::client::WecareClient;
use crate::error::ApiResult;
use serde_json::Value;

/// Team API interface
#[derive(Clone)]
pub struct TeamsApi {
    client: WecareClient,
}

impl TeamsApi {
    /// Create a new teams API interface
    pub(crate) fn new(client: WecareClient) -> Self {
        Self { client }
    }

    /// List teams
    pub async fn list(&self) -> ApiResult<Value> {
        self.client.get("/teams").await
    }

    /// Fetch one team
    pub async fn get(&self, id: &str) -> ApiResult<Value> {
        self.client.get(&format!("/teams/{id}")).await
    }

    /// Create a team
    pub async fn create(&self, team: &Value) -> ApiResult<Value> {
        self.client.post("/teams", team).await
    }

    /// Update a team
    pub async fn update(&self, id: &str, team: &Value) -> ApiResult<Value> {
        self.client.put(&format!("/teams/{id}"), team).await
    }

    /// Delete a team
    pub async fn delete(&self, id: &str) -> ApiResult<Value> {
        self.client.delete(&format!("/teams/{id}")).await
    }
}
