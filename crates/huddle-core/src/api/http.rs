use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use super::api::{ByteStream, MeetingApi};
use super::types::{
    CompanyAsset, MeetingImage, MeetingMessageRecord, MeetingRecord, SendMessageRequest,
    UpdateMessageRequest,
};
use crate::config::HuddleConfig;
use crate::error::ApiError;

/// `MeetingApi` over the backend's REST endpoints.
pub struct HttpMeetingApi {
    client: Client,
    base_url: String,
}

impl HttpMeetingApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &HuddleConfig) -> Result<Self, ApiError> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.client.get(self.url(path)).send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }
}

async fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

fn into_byte_stream(resp: Response) -> ByteStream {
    Box::pin(resp.bytes_stream().map(|chunk| chunk.map_err(ApiError::from)))
}

#[async_trait]
impl MeetingApi for HttpMeetingApi {
    async fn get_meeting(&self, meeting_id: i64) -> Result<MeetingRecord, ApiError> {
        self.get_json(&format!("meetings/{meeting_id}")).await
    }

    async fn list_messages(&self, meeting_id: i64) -> Result<Vec<MeetingMessageRecord>, ApiError> {
        self.get_json(&format!("meetings/{meeting_id}/messages")).await
    }

    async fn send_message(
        &self,
        meeting_id: i64,
        staff_id: i64,
        request: &SendMessageRequest,
        save_user_message: bool,
    ) -> Result<ByteStream, ApiError> {
        let resp = self
            .client
            .post(self.url(&format!("meetings/{meeting_id}/messages")))
            .query(&[
                ("staff_id", staff_id.to_string()),
                ("save_user_message", save_user_message.to_string()),
            ])
            .json(request)
            .send()
            .await?;
        Ok(into_byte_stream(check_status(resp).await?))
    }

    async fn resend_message(&self, message_id: i64, staff_id: i64) -> Result<ByteStream, ApiError> {
        let resp = self
            .client
            .post(self.url(&format!("meetings/messages/{message_id}/resend")))
            .query(&[("staff_id", staff_id.to_string())])
            .send()
            .await?;
        Ok(into_byte_stream(check_status(resp).await?))
    }

    async fn update_message(
        &self,
        message_id: i64,
        request: &UpdateMessageRequest,
    ) -> Result<(), ApiError> {
        let resp = self
            .client
            .put(self.url(&format!("meetings/messages/{message_id}")))
            .json(request)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn list_images(&self, meeting_id: i64) -> Result<Vec<MeetingImage>, ApiError> {
        self.get_json(&format!("meetings/{meeting_id}/images")).await
    }

    async fn list_assets(&self, company_id: i64) -> Result<Vec<CompanyAsset>, ApiError> {
        self.get_json(&format!("companies/{company_id}/assets")).await
    }
}
