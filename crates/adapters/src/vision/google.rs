//! Google Cloud Vision OCR adapter

use alt_text_bot_domain::{BotError, OcrProvider, OcrText};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{VisionConfig, http_client, transport_error};

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com";

/// Text detection through `images:annotate`
pub struct GoogleVisionOcr {
    client: Client,
    api_key: SecretString,
    endpoint: String,
}

impl GoogleVisionOcr {
    pub fn new(api_key: SecretString, config: &VisionConfig) -> Self {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT.to_string(), config)
    }

    pub fn with_endpoint(api_key: SecretString, endpoint: String, config: &VisionConfig) -> Self {
        Self {
            client: http_client(config),
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest<'a> {
    requests: [ImageRequest<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest<'a> {
    image: Image<'a>,
    features: [Feature; 1],
}

#[derive(Serialize)]
struct Image<'a> {
    source: ImageSource<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageSource<'a> {
    image_uri: &'a str,
}

#[derive(Serialize)]
struct Feature {
    r#type: &'static str,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<FullText>,
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Deserialize)]
struct FullText {
    text: String,
}

#[derive(Deserialize)]
struct TextAnnotation {
    locale: Option<String>,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl OcrProvider for GoogleVisionOcr {
    async fn recognize(&self, image_url: &str) -> Result<OcrText, BotError> {
        let request = AnnotateRequest {
            requests: [ImageRequest {
                image: Image {
                    source: ImageSource {
                        image_uri: image_url,
                    },
                },
                features: [Feature {
                    r#type: "TEXT_DETECTION",
                }],
            }],
        };

        let url = format!("{}/v1/images:annotate", self.endpoint);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Ocr(format!("API returned {}: {}", status, body)));
        }

        let annotated: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| BotError::Ocr(format!("Invalid response: {}", e)))?;

        let Some(image) = annotated.responses.into_iter().next() else {
            return Err(BotError::Ocr("Empty response".to_string()));
        };

        if let Some(error) = image.error {
            return Err(BotError::Ocr(error.message));
        }

        let language = image
            .text_annotations
            .first()
            .and_then(|a| a.locale.clone());
        let text = match image.full_text_annotation {
            Some(full) => full.text,
            None => image
                .text_annotations
                .into_iter()
                .next()
                .map(|a| a.description)
                .unwrap_or_default(),
        };

        tracing::debug!(url = %image_url, chars = text.chars().count(), "OCR complete");

        Ok(OcrText { text, language })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ocr(server: &MockServer) -> GoogleVisionOcr {
        GoogleVisionOcr::with_endpoint(
            SecretString::new("vision-key".into()),
            server.uri(),
            &VisionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_recognize_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .and(header("x-goog-api-key", "vision-key"))
            .and(body_json(serde_json::json!({
                "requests": [{
                    "image": {"source": {"imageUri": "https://pbs/1.jpg"}},
                    "features": [{"type": "TEXT_DETECTION"}]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responses": [{
                    "textAnnotations": [{"locale": "en", "description": "SALE\n50% off"}],
                    "fullTextAnnotation": {"text": "SALE\n50% off\n"}
                }]
            })))
            .mount(&mock_server)
            .await;

        let result = ocr(&mock_server).recognize("https://pbs/1.jpg").await.unwrap();

        assert_eq!(result.text, "SALE\n50% off\n");
        assert_eq!(result.language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_no_text_is_empty_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"responses": [{}]})),
            )
            .mount(&mock_server)
            .await;

        let result = ocr(&mock_server).recognize("https://pbs/1.jpg").await.unwrap();

        assert!(result.text.is_empty());
    }

    #[tokio::test]
    async fn test_per_image_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responses": [{"error": {"code": 3, "message": "Bad image data."}}]
            })))
            .mount(&mock_server)
            .await;

        let result = ocr(&mock_server).recognize("https://pbs/1.jpg").await;

        assert_eq!(result, Err(BotError::Ocr("Bad image data.".to_string())));
    }

    #[tokio::test]
    async fn test_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key invalid"))
            .mount(&mock_server)
            .await;

        let result = ocr(&mock_server).recognize("https://pbs/1.jpg").await;

        assert!(matches!(result, Err(BotError::Ocr(msg)) if msg.contains("403")));
    }
}
