/// Inference Client: the single HTTP path to remote embedding / NER endpoints.
///
/// Speaks the common `{"inputs": ...}` JSON convention of hosted inference servers.
/// Retries on 429 and 5xx with exponential backoff; every other status fails fast.
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::ModelError;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct InferenceErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    api_key: Option<String>,
}

impl InferenceClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, ModelError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_key })
    }

    /// POSTs `{"inputs": text}` to `url` and decodes the JSON response.
    pub async fn infer<T: DeserializeOwned>(&self, url: &str, text: &str) -> Result<T, ModelError> {
        let request_body = InferenceRequest { inputs: text };
        let mut last_error: Option<ModelError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 250ms, 500ms
                let delay = Duration::from_millis(250 * (1 << (attempt - 1)));
                warn!(
                    "Inference call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(url).json(&request_body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ModelError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Inference endpoint returned {}: {}", status, body);
                last_error = Some(ModelError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ModelError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
            }

            let body = response.bytes().await?;
            debug!("Inference call succeeded: url={url}, bytes={}", body.len());
            return serde_json::from_slice(&body).map_err(ModelError::Parse);
        }

        Err(last_error.unwrap_or_else(|| {
            ModelError::Unavailable(format!("no response after {MAX_RETRIES} attempts"))
        }))
    }
}

/// Pulls `error` out of a JSON error body, falling back to the raw text.
fn error_message(body: String) -> String {
    serde_json::from_str::<InferenceErrorBody>(&body)
        .map(|e| e.error)
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_error_field() {
        let body = r#"{"error": "Model is currently loading"}"#.to_string();
        assert_eq!(error_message(body), "Model is currently loading");
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("Bad Gateway".to_string()), "Bad Gateway");
    }

    #[test]
    fn test_request_body_shape() {
        let json = serde_json::to_string(&InferenceRequest { inputs: "hello" }).unwrap();
        assert_eq!(json, r#"{"inputs":"hello"}"#);
    }
}
