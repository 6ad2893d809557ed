//! Ride endpoints

use crate::client::WecareClient;
use crate::error::ApiResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle state of a ride
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    /// Waiting for a driver
    Pending,
    /// Driver assigned
    Assigned,
    /// Driver on the way to the patient
    EnRouteToPickup,
    /// Driver at the pickup location
    ArrivedAtPickup,
    /// Patient in the vehicle
    InProgress,
    /// Ride finished
    Completed,
    /// Ride cancelled
    Cancelled,
    /// Driver declined
    Rejected,
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = serde_json::to_value(self).map_err(|_| fmt::Error)?;
        f.write_str(value.as_str().unwrap_or_default())
    }
}

#[derive(Serialize)]
struct StatusUpdate<'a> {
    status: RideStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    driver_id: Option<&'a str>,
}

/// Ride API interface
#[derive(Clone)]
pub struct RidesApi {
    client: WecareClient,
}

impl RidesApi {
    /// Create a new rides API interface
    pub(crate) fn new(client: WecareClient) -> Self {
        Self { client }
    }

    /// List rides
    pub async fn list(&self) -> ApiResult<Value> {
        self.client.get("/rides").await
    }

    /// Fetch one ride
    pub async fn get(&self, id: &str) -> ApiResult<Value> {
        self.client.get(&format!("/rides/{id}")).await
    }

    /// Request a ride
    pub async fn create(&self, ride: &Value) -> ApiResult<Value> {
        self.client.post("/rides", ride).await
    }

    /// Move a ride to a new status, optionally assigning a driver
    pub async fn update_status(
        &self,
        id: &str,
        status: RideStatus,
        driver_id: Option<&str>,
    ) -> ApiResult<Value> {
        self.client
            .put(&format!("/rides/{id}"), &StatusUpdate { status, driver_id })
            .await
    }

    /// Delete a ride
    pub async fn delete(&self, id: &str) -> ApiResult<Value> {
        self.client.delete(&format!("/rides/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use crate::transport::TransportBody;
    use reqwest::Method;
    use serde_json::json;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(RideStatus::EnRouteToPickup.to_string(), "EN_ROUTE_TO_PICKUP");
        let status: RideStatus = serde_json::from_str(r#""IN_PROGRESS""#).unwrap();
        assert_eq!(status, RideStatus::InProgress);
    }

    #[tokio::test]
    async fn test_update_status_body() {
        let fx = Fixture::new();
        fx.transport
            .respond_json(Method::PUT, "/rides/R7", 200, json!({"id": "R7", "status": "ASSIGNED"}));

        let ride = fx
            .client
            .rides()
            .update_status("R7", RideStatus::Assigned, Some("D2"))
            .await
            .unwrap();
        assert_eq!(ride["status"], "ASSIGNED");

        let call = &fx.transport.calls_to(Method::PUT, "/rides/R7")[0];
        match &call.body {
            TransportBody::Text(text) => {
                let sent: Value = serde_json::from_str(text).unwrap();
                assert_eq!(sent, json!({"status": "ASSIGNED", "driver_id": "D2"}));
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }
}
