use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    config::ClientConfig,
    error::{EditError, Result},
    request::{EditRequest, EditResponse},
};

const EDITS_PATH: &str = "images/edits";

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Thin client for the hosted image edits endpoint
#[derive(Debug, Clone)]
pub struct ImageEditClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl ImageEditClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EditError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http_client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Post the edit and return the provider's answer untouched. No retries.
    pub async fn edit(&self, request: &EditRequest) -> Result<EditResponse> {
        let url = self.config.endpoint(EDITS_PATH);
        info!(
            "Requesting {} edit(s) at {} (mask: {})",
            request.options.n,
            request.options.size,
            request.mask.is_some()
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(Self::build_form(request)?)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_reqwest_error(e))?;
        debug!("Edit endpoint answered {} with {} bytes", status, body.len());

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            warn!("Edit request failed with {}: {}", status, message);
            return Err(EditError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EditResponse = serde_json::from_slice(&body)?;
        info!("Received {} edited image(s)", parsed.data.len());
        Ok(parsed)
    }

    fn build_form(request: &EditRequest) -> Result<Form> {
        let mut form = Form::new()
            .part("image", Self::png_part(request.image.clone(), "image.png")?)
            .text("prompt", request.prompt.clone())
            .text("n", request.options.n.to_string())
            .text("size", request.options.size.to_string())
            .text("response_format", request.options.response_format.to_string());

        if let Some(mask) = &request.mask {
            form = form.part("mask", Self::png_part(mask.clone(), "mask.png")?);
        }
        Ok(form)
    }

    fn png_part(bytes: Vec<u8>, file_name: &'static str) -> Result<Part> {
        Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mask_canvas::PNG_MIME)
            .map_err(|e| EditError::InvalidRequest(format!("Invalid mime type: {}", e)))
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> EditError {
        if e.is_timeout() {
            EditError::Timeout(self.config.timeout_secs)
        } else if e.is_connect() {
            EditError::Network(format!("Unable to connect: {}", e))
        } else {
            EditError::Network(format!("Request failed: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::EditOptions;
    use image::{Rgba, RgbaImage};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn request(with_mask: bool) -> EditRequest {
        let png = mask_canvas::encode_png(&RgbaImage::from_pixel(16, 16, Rgba([9, 9, 9, 255]))).unwrap();
        let mask = with_mask.then(|| png.clone());
        EditRequest::new(png, mask, "a small boat".to_string(), EditOptions::default()).unwrap()
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    /// Serve exactly one HTTP request with a canned response and hand back the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let read = socket.read(&mut chunk).await.unwrap();
                if read == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..read]);
                let Some(header_end) = find(&raw, b"\r\n\r\n") else { continue };
                let headers = String::from_utf8_lossy(&raw[..header_end]).to_ascii_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok());
                let complete = match content_length {
                    Some(length) => raw.len() >= header_end + 4 + length,
                    None => raw.ends_with(b"0\r\n\r\n"),
                };
                if complete {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            tx.send(raw).ok();
        });

        (base_url, rx)
    }

    fn client(base_url: &str) -> ImageEditClient {
        ImageEditClient::new(ClientConfig::new("sk-test").with_base_url(base_url).with_timeout_secs(10)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_edit_posts_multipart_form() {
        let (base_url, raw_request) =
            serve_once("200 OK", r#"{"created": 1700000000, "data": [{"url": "https://cdn.test/1.png"}]}"#).await;

        let response = client(&base_url).edit(&request(true)).await.unwrap();
        assert_eq!(response.created, 1_700_000_000);
        assert_eq!(response.data[0].url.as_deref(), Some("https://cdn.test/1.png"));

        let raw = String::from_utf8_lossy(&raw_request.await.unwrap()).into_owned();
        assert!(raw.starts_with("POST /v1/images/edits"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        assert!(raw.contains("name=\"image\"; filename=\"image.png\""));
        assert!(raw.contains("name=\"mask\"; filename=\"mask.png\""));
        assert!(raw.contains("a small boat"));
        assert!(raw.contains("1024x1024"));
    }

    #[tokio::test]
    async fn test_mask_field_is_omitted_without_mask() {
        let (base_url, raw_request) = serve_once("200 OK", r#"{"created": 1, "data": []}"#).await;

        client(&base_url).edit(&request(false)).await.unwrap();
        let raw = String::from_utf8_lossy(&raw_request.await.unwrap()).into_owned();
        assert!(!raw.contains("name=\"mask\""));
    }

    #[tokio::test]
    async fn test_api_error_message_is_surfaced() {
        let (base_url, _raw) = serve_once(
            "400 Bad Request",
            r#"{"error": {"message": "Invalid input image - format must be in ['RGBA']", "type": "invalid_request_error"}}"#,
        )
        .await;

        let err = client(&base_url).edit(&request(false)).await.unwrap_err();
        match err {
            EditError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("Invalid input image"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}/v1", addr)).edit(&request(false)).await.unwrap_err();
        assert!(matches!(err, EditError::Network(_)));
    }
}
