//! Multipart form reading shared by the audio and CV upload endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;
use crate::speech::AudioUpload;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl UploadedFile {
    pub fn into_audio(self) -> AudioUpload {
        AudioUpload::new(
            self.bytes,
            self.content_type.as_deref(),
            self.file_name.as_deref(),
        )
    }
}

/// A fully buffered multipart body. Parts with a file name are files,
/// everything else is a text field.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(String::from) else {
                continue;
            };

            if field.file_name().is_some() {
                let file_name = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let bytes = field.bytes().await?;
                debug!(field = %name, size = bytes.len(), "Received file part");
                form.files.insert(
                    name,
                    UploadedFile {
                        bytes,
                        content_type,
                        file_name,
                    },
                );
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Trimmed text value; `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name).filter(|f| !f.bytes.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::{DefaultBodyLimit, FromRequest},
        http::{header, Request, StatusCode},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    const BOUNDARY: &str = "XBOUNDARYX";

    async fn multipart_from(body: String) -> Multipart {
        let request = Request::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_reads_text_and_file_parts() {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"sessionId\"\r\n\r\n  abc  \r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"notes\"\r\n\r\n \r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"a.webm\"\r\n\
             Content-Type: audio/webm\r\n\r\nRIFFDATA\r\n--{b}--\r\n",
            b = BOUNDARY
        );

        let mut form = FormData::read(multipart_from(body).await).await.unwrap();

        assert_eq!(form.text("sessionId"), Some("abc"));
        assert_eq!(form.text("notes"), None);
        assert_eq!(form.text("missing"), None);

        let audio = form.take_file("audio").unwrap().into_audio();
        assert_eq!(audio.mime_type, "audio/webm");
        assert_eq!(audio.file_name, "a.webm");
        assert_eq!(&audio.bytes[..], b"RIFFDATA");
        assert!(form.take_file("audio").is_none());
    }

    #[tokio::test]
    async fn test_empty_file_counts_as_missing() {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"a.webm\"\r\n\r\n\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        let mut form = FormData::read(multipart_from(body).await).await.unwrap();
        assert!(form.take_file("audio").is_none());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_413() {
        async fn read_form(multipart: Multipart) -> Result<StatusCode, AppError> {
            FormData::read(multipart).await?;
            Ok(StatusCode::OK)
        }
        let app = Router::new()
            .route("/upload", post(read_form))
            .layer(DefaultBodyLimit::max(64));

        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"a.webm\"\r\n\r\n{data}\r\n--{b}--\r\n",
            b = BOUNDARY,
            data = "x".repeat(1024)
        );
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("PAYLOAD_TOO_LARGE"));
    }

    #[tokio::test]
    async fn test_truncated_multipart_is_400() {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"sessionId\"\r\n\r\nabc",
            b = BOUNDARY
        );
        let err = FormData::read(multipart_from(body).await).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
