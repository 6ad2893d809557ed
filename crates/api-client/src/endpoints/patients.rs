//! Patient endpoints

use crate::client::WecareClient;
use crate::error::ApiResult;
use serde_json::Value;

/// Patient API interface
#[derive(Clone)]
pub struct PatientsApi {
    client: WecareClient,
}

impl PatientsApi {
    /// Create a new patients API interface
    pub(crate) fn new(client: WecareClient) -> Self {
        Self { client }
    }

    /// List patients visible to the current user
    pub async fn list(&self) -> ApiResult<Value> {
        self.client.get("/patients").await
    }

    /// Fetch one patient
    pub async fn get(&self, id: &str) -> ApiResult<Value> {
        self.client.get(&format!("/patients/{id}")).await
    }

    /// Register a patient
    pub async fn create(&self, patient: &Value) -> ApiResult<Value> {
        self.client.post("/patients", patient).await
    }

    /// Replace a patient record
    pub async fn update(&self, id: &str, patient: &Value) -> ApiResult<Value> {
        self.client.put(&format!("/patients/{id}"), patient).await
    }

    /// Delete a patient record
    pub async fn delete(&self, id: &str) -> ApiResult<Value> {
        self.client.delete(&format!("/patients/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::Fixture;
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_routes() {
        let fx = Fixture::new();
        fx.transport
            .respond_json(Method::GET, "/patients", 200, json!([{"id": "P1"}]));
        fx.transport
            .respond_json(Method::GET, "/patients/P1", 200, json!({"id": "P1"}));
        fx.transport.respond(Method::DELETE, "/patients/P1", 204, "");

        let patients = fx.client.patients();
        assert_eq!(patients.list().await.unwrap()[0]["id"], "P1");
        assert_eq!(patients.get("P1").await.unwrap()["id"], "P1");
        assert!(patients.delete("P1").await.unwrap().is_null());
    }
}
