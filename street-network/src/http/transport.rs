//! JSON over HTTP, shared by the third-party adapters.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::breaker::CallError;

use super::SetupError;

/// Maximum response body kept in error messages.
const MAX_ERROR_BODY: usize = 500;

/// A reqwest client that decodes JSON answers and turns non-2xx into errors.
#[derive(Debug, Clone)]
pub(crate) struct JsonTransport {
    http: reqwest::Client,
}

impl JsonTransport {
    pub(crate) fn new(timeout_secs: u64) -> Result<Self, SetupError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SetupError::Client(e.to_string()))?;
        Ok(Self { http })
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<T, CallError> {
        debug!(url, "GET");
        let response = self.http.get(url).query(query).send().await?;
        read_json(response).await
    }

    pub(crate) async fn post<B, T>(
        &self,
        url: &str,
        query: &[(String, String)],
        body: &B,
    ) -> Result<T, CallError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(url, "POST");
        let response = self
            .http
            .post(url)
            .query(query)
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CallError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CallError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| CallError::Decode {
        message: format!(
            "{e} (body: {})",
            body.chars().take(MAX_ERROR_BODY).collect::<String>()
        ),
    })
}
