//! Driver endpoints

use crate::client::WecareClient;
use crate::error::ApiResult;
use serde_json::Value;

/// Driver API interface
#[derive(Clone)]
pub struct DriversApi {
    client: WecareClient,
}

impl DriversApi {
    /// Create a new drivers API interface
    pub(crate) fn new(client: WecareClient) -> Self {
        Self { client }
    }

    /// List all drivers
    pub async fn list(&self) -> ApiResult<Value> {
        self.client.get("/drivers").await
    }

    /// Drivers currently available for assignment
    pub async fn available(&self) -> ApiResult<Value> {
        self.client.get("/drivers/available").await
    }

    /// Rides assigned to the signed-in driver
    pub async fn my_rides(&self) -> ApiResult<Value> {
        self.client.get("/drivers/my-rides").await
    }

    /// Register a driver
    pub async fn create(&self, driver: &Value) -> ApiResult<Value> {
        self.client.post("/drivers", driver).await
    }

    /// Update a driver
    pub async fn update(&self, id: &str, driver: &Value) -> ApiResult<Value> {
        self.client.put(&format!("/drivers/{id}"), driver).await
    }

    /// Delete a driver
    pub async fn delete(&self, id: &str) -> ApiResult<Value> {
        self.client.delete(&format!("/drivers/{id}")).await
    }
}
