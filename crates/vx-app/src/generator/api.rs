use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use vx_core::ModelMesh;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::generator::schemas::{DesignUpdate, ErrorBody, GenerateRequest, GenerateResponse, JobStatusResponse};

pub const API_PREFIX: &str = "/api/v1";

/// The two calls a generation session needs
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Queue a generation and return its job id
    async fn submit(&self, prompt: &str) -> Result<String>;

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse>;
}

/// HTTP client for the layout service
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}{}", self.base_url, API_PREFIX, path);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Model URLs may be absolute or relative to the server origin
    pub fn resolve_asset_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    pub async fn fetch_model(&self, model_url: &str) -> Result<ModelMesh> {
        let url = self.resolve_asset_url(model_url);
        info!("Downloading model from {}", url);

        let response = check_status(self.client.get(&url).send().await?).await?;
        let bytes = response.bytes().await?;
        debug!("Received {} bytes of model data", bytes.len());

        Ok(ModelMesh::from_ply_bytes(&bytes)?)
    }

    pub async fn list_designs(&self, limit: u32) -> Result<Value> {
        let builder = self.request(Method::GET, "/designs").query(&[("limit", limit)]);
        send_json(builder).await
    }

    pub async fn my_designs(&self) -> Result<Value> {
        send_json(self.request(Method::GET, "/my-designs")).await
    }

    pub async fn update_design(&self, design_id: &str, update: &DesignUpdate) -> Result<Value> {
        let builder = self
            .request(Method::PUT, &format!("/designs/{}", design_id))
            .json(update);
        send_json(builder).await
    }

    pub async fn duplicate_design(&self, design_id: &str) -> Result<Value> {
        send_json(self.request(Method::POST, &format!("/designs/{}/duplicate", design_id))).await
    }
}

#[async_trait]
impl JobApi for ApiClient {
    async fn submit(&self, prompt: &str) -> Result<String> {
        let builder = self
            .request(Method::POST, "/generate")
            .json(&GenerateRequest { prompt: prompt.to_string() });
        let response: GenerateResponse = send_json(builder).await?;

        if !response.success {
            return Err(AppError::Rejected(
                response.error.unwrap_or_else(|| "the server did not accept the request".to_string()),
            ));
        }

        let job_id = response
            .job_id
            .ok_or_else(|| AppError::Rejected("response carried no job id".to_string()))?;
        info!("Submitted generation job {}", job_id);
        Ok(job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse> {
        send_json(self.request(Method::GET, &format!("/jobs/{}", job_id))).await
    }
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
    let response = check_status(builder.send().await?).await?;
    Ok(response.json().await?)
}

/// Turn non-success responses into `BackendError`, preferring the server's `detail`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody { detail: Value::String(detail) }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body,
    };

    Err(AppError::BackendError(format!("HTTP {}: {}", status, message)))
}
