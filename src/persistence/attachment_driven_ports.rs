use crate::domain::attachment::AttachmentFile;
use crate::domain::attachment::driven_ports::{
    AttachmentPortError, LinkHost, LinkHostResponse, ObjectStorage,
};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, anyhow};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

/// Objects in a Firebase Storage bucket, reached through the REST API
pub struct FirebaseObjectStorage {
    bucket_url: String,
}

impl FirebaseObjectStorage {
    pub fn new(base_url: &str, bucket: &str) -> Self {
        FirebaseObjectStorage {
            bucket_url: format!("{}/v0/b/{bucket}/o", super::trim_base(base_url)),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.bucket_url, urlencoding::encode(path))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    download_tokens: Option<String>,
}

/// Permission and quota responses are reported as [AttachmentPortError::Unauthorized] so the
/// caller can fall back to a placeholder
async fn classify_failure(response: reqwest::Response) -> Result<reqwest::Response, AttachmentPortError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED
        | StatusCode::PAYMENT_REQUIRED
        | StatusCode::FORBIDDEN
        | StatusCode::TOO_MANY_REQUESTS => {
            Err(AttachmentPortError::Unauthorized(format!("{status}: {body}")))
        }
        _ => Err(anyhow!("storage responded with {status}: {body}").into()),
    }
}

impl ObjectStorage for FirebaseObjectStorage {
    async fn put_object(
        &self,
        path: &str,
        file: &AttachmentFile,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), AttachmentPortError> {
        let request = ext_cxn
            .http_client()
            .post(format!("{}?name={}", self.bucket_url, urlencoding::encode(path)))
            .header(reqwest::header::CONTENT_TYPE, file.content_type.as_str())
            .body(file.bytes.clone());

        let response = super::with_credential(request, &*ext_cxn)
            .send()
            .await
            .context("uploading an attachment")?;
        classify_failure(response).await?;

        Ok(())
    }

    async fn download_url(
        &self,
        path: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<String, AttachmentPortError> {
        let object_url = self.object_url(path);
        let request = ext_cxn.http_client().get(&object_url);

        let response = super::with_credential(request, &*ext_cxn)
            .send()
            .await
            .context("fetching attachment metadata")?;
        let metadata: ObjectMetadata = classify_failure(response)
            .await?
            .json()
            .await
            .context("decoding attachment metadata")?;

        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| anyhow!("storage did not issue a download token for {path}"))?;

        Ok(format!(
            "{object_url}?alt=media&token={}",
            urlencoding::encode(token)
        ))
    }
}

/// A file-sharing service that accepts a multipart upload and answers with a public link
pub struct LinkHostUploader {
    upload_url: String,
}

impl LinkHostUploader {
    pub fn new(upload_url: impl Into<String>) -> Self {
        LinkHostUploader {
            upload_url: upload_url.into(),
        }
    }
}

impl LinkHost for LinkHostUploader {
    async fn post_file(
        &self,
        file: &AttachmentFile,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<LinkHostResponse, anyhow::Error> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .context("building the upload form")?;
        let form = Form::new().part("file", part);

        let response = ext_cxn
            .http_client()
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .context("posting an attachment to the link host")?;
        let uploaded = super::success_or_error(response)
            .await?
            .json()
            .await
            .context("decoding the link host response")?;

        Ok(uploaded)
    }
}
