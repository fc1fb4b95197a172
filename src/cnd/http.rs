//! HTTP client for the swap daemon

use super::types::{CndInfo, Problem, SwapRequest};
use super::{Cnd, RFC003_SWAPS_PATH, SWAPS_PATH};
use crate::error::{SdkError, SdkResult};
use crate::siren::{Action, Entity, Method};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

pub struct HttpCnd {
    client: Client,
    base_url: String,
}

impl HttpCnd {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SdkResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{}", self.base_url, href)
        }
    }
}

/// Turn a non-success response into a typed error
pub(crate) async fn check_response(response: Response, what: &str) -> SdkResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(SdkError::NotFound(what.to_string()));
    }

    let problem: Problem = response.json().await.unwrap_or_default();
    Err(SdkError::Problem {
        status: status.as_u16(),
        title: problem
            .title
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
        detail: problem.detail,
    })
}

async fn optional_json(response: Response) -> SdkResult<Option<serde_json::Value>> {
    let body = response.bytes().await?;
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| SdkError::ProtocolViolation(format!("action response is not JSON: {}", e)))
}

#[async_trait]
impl Cnd for HttpCnd {
    async fn info(&self) -> SdkResult<CndInfo> {
        let response = self.client.get(self.url("/")).send().await?;
        let response = check_response(response, "daemon info").await?;
        Ok(response.json().await?)
    }

    async fn fetch(&self, href: &str) -> SdkResult<Entity> {
        debug!("GET {}", href);
        let response = self.client.get(self.url(href)).send().await?;
        let response = check_response(response, href).await?;
        response
            .json()
            .await
            .map_err(|e| SdkError::ProtocolViolation(format!("{} is not a Siren entity: {}", href, e)))
    }

    async fn execute_action(
        &self,
        action: &Action,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> SdkResult<Option<serde_json::Value>> {
        debug!("{:?} {} ({} fields)", action.method, action.href, fields.len());
        let url = self.url(&action.href);

        let request = match action.method {
            Method::Get => {
                let query: Vec<(String, String)> = fields
                    .iter()
                    .map(|(k, v)| {
                        let v = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                        (k.clone(), v)
                    })
                    .collect();
                self.client.get(url).query(&query)
            }
            Method::Post => self.client.post(url).json(fields),
            Method::Put => self.client.put(url).json(fields),
            Method::Delete => self.client.delete(url),
        };

        let response = request.send().await?;
        let response = check_response(response, &action.href).await?;
        optional_json(response).await
    }

    async fn post_swap(&self, request: &SwapRequest) -> SdkResult<String> {
        let response = self
            .client
            .post(self.url(RFC003_SWAPS_PATH))
            .json(request)
            .send()
            .await?;
        let response = check_response(response, "swap endpoint").await?;

        if let Some(location) = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|l| l.to_str().ok())
        {
            return Ok(location.to_string());
        }

        let body: serde_json::Value = response.json().await?;
        body.get("id")
            .and_then(|id| id.as_str())
            .map(|id| format!("{}/{}", RFC003_SWAPS_PATH, id))
            .ok_or_else(|| {
                SdkError::ProtocolViolation("swap created without location or id".to_string())
            })
    }

    async fn get_swaps(&self) -> SdkResult<Vec<Entity>> {
        let collection = self.fetch(SWAPS_PATH).await?;
        Ok(collection.entities)
    }
}
