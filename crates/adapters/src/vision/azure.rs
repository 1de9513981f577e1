//! Azure Computer Vision caption adapter

use alt_text_bot_domain::{BotError, Caption, DescribeProvider, Language};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{VisionConfig, http_client, transport_error};

/// Captions through the `describe` endpoint
pub struct AzureDescriber {
    client: Client,
    api_key: SecretString,
    endpoint: String,
    max_candidates: u32,
}

impl AzureDescriber {
    /// `endpoint` is the resource URL, e.g. `https://<name>.cognitiveservices.azure.com`
    pub fn new(api_key: SecretString, endpoint: String, config: &VisionConfig) -> Self {
        Self {
            client: http_client(config),
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            max_candidates: config.max_candidates.max(1),
        }
    }
}

#[derive(Serialize)]
struct DescribeRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct DescribeResponse {
    description: Description,
}

#[derive(Deserialize)]
struct Description {
    #[serde(default)]
    captions: Vec<AzureCaption>,
}

#[derive(Deserialize)]
struct AzureCaption {
    text: String,
    confidence: f64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl DescribeProvider for AzureDescriber {
    async fn describe(
        &self,
        image_url: &str,
        language: &Language,
    ) -> Result<Vec<Caption>, BotError> {
        let url = format!("{}/vision/v3.2/describe", self.endpoint);
        let max_candidates = self.max_candidates.to_string();

        let response = self
            .client
            .post(&url)
            .query(&[
                ("maxCandidates", max_candidates.as_str()),
                ("language", language.primary()),
            ])
            .header("Ocp-Apim-Subscription-Key", self.api_key.expose_secret())
            .json(&DescribeRequest { url: image_url })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(parsed) if parsed.error.code == "NotSupportedLanguage" => {
                    BotError::UnsupportedLanguage(language.to_string())
                }
                Ok(parsed) => BotError::Describe(format!(
                    "{} ({}): {}",
                    parsed.error.code, status, parsed.error.message
                )),
                Err(_) => BotError::Describe(format!("API returned {}: {}", status, body)),
            });
        }

        let described: DescribeResponse = response
            .json()
            .await
            .map_err(|e| BotError::Describe(format!("Invalid response: {}", e)))?;

        let captions: Vec<Caption> = described
            .description
            .captions
            .into_iter()
            .map(|c| Caption {
                text: c.text,
                confidence: c.confidence,
            })
            .collect();

        tracing::debug!(url = %image_url, captions = captions.len(), "Description complete");

        Ok(captions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn describer(server: &MockServer) -> AzureDescriber {
        AzureDescriber::new(
            SecretString::new("azure-key".into()),
            server.uri(),
            &VisionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_describe_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vision/v3.2/describe"))
            .and(query_param("maxCandidates", "3"))
            .and(query_param("language", "pt"))
            .and(header("Ocp-Apim-Subscription-Key", "azure-key"))
            .and(body_json(serde_json::json!({"url": "https://pbs/1.jpg"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "description": {
                    "tags": ["dog"],
                    "captions": [
                        {"text": "um cachorro", "confidence": 0.91},
                        {"text": "um animal", "confidence": 0.42}
                    ]
                }
            })))
            .mount(&mock_server)
            .await;

        let captions = describer(&mock_server)
            .describe("https://pbs/1.jpg", &Language::new("pt-BR"))
            .await
            .unwrap();

        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].text, "um cachorro");
        assert!((captions[1].confidence - 0.42).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unsupported_language() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vision/v3.2/describe"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": "NotSupportedLanguage", "message": "Language not supported"}
            })))
            .mount(&mock_server)
            .await;

        let result = describer(&mock_server)
            .describe("https://pbs/1.jpg", &Language::new("de"))
            .await;

        assert_eq!(result, Err(BotError::UnsupportedLanguage("de".to_string())));
    }

    #[tokio::test]
    async fn test_other_errors_are_describe_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vision/v3.2/describe"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&mock_server)
            .await;

        let result = describer(&mock_server)
            .describe("https://pbs/1.jpg", &Language::english())
            .await;

        assert!(matches!(result, Err(BotError::Describe(_))));
    }
}
