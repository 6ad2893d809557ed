//! Authentication endpoints

use crate::classify::{LOGIN_ENDPOINT, PROFILE_ENDPOINT};
use crate::client::WecareClient;
use crate::error::ApiResult;
use crate::request::RequestDescriptor;
use crate::transport::MultipartForm;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile image upload endpoint
pub const PROFILE_IMAGE_ENDPOINT: &str = "/auth/upload-profile-image";

/// Multipart field carrying the image
pub const PROFILE_IMAGE_FIELD: &str = "profileImage";

/// Authentication API interface
///
/// Raw calls only; session bookkeeping lives in
/// [`SessionManager`](crate::session::SessionManager).
#[derive(Clone)]
pub struct AuthApi {
    client: WecareClient,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

impl AuthApi {
    /// Create a new auth API interface
    pub(crate) fn new(client: WecareClient) -> Self {
        Self { client }
    }

    /// `POST /auth/login`, returning the raw `{ token, user }` body
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Value> {
        self.client
            .post(LOGIN_ENDPOINT, &Credentials { email, password })
            .await
    }

    /// `GET /auth/me`
    pub async fn me(&self) -> ApiResult<Value> {
        self.client.get(PROFILE_ENDPOINT).await
    }

    /// `GET /auth/me` with a token that is not (yet) the session's
    pub async fn me_with_token(&self, token: &str) -> ApiResult<Value> {
        self.client
            .send(RequestDescriptor::get(PROFILE_ENDPOINT).with_bearer(token))
            .await
    }

    /// Upload a new profile image
    pub async fn upload_profile_image(
        &self,
        data: Vec<u8>,
        file_name: &str,
        mime: Option<&str>,
    ) -> ApiResult<ProfileImageResponse> {
        let form = MultipartForm::new().file(PROFILE_IMAGE_FIELD, file_name, mime, data);
        self.client.upload(PROFILE_IMAGE_ENDPOINT, form).await
    }
}

/// Response of a profile image upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileImageResponse {
    /// Public URL of the stored image
    #[serde(rename = "imageUrl", alias = "profile_image_url")]
    pub image_url: String,
    /// Optional server message
    #[serde(default)]
    pub message: Option<String>,
}
