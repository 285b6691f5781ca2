use crate::domain::attachment::driven_ports::{AttachmentPortError, LinkHost, ObjectStorage};
use crate::external_connections::ExternalConnectivity;
use derive_more::Display;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Image URL substituted when object storage refuses an upload for permission or quota reasons
pub const DEFAULT_PLACEHOLDER_IMAGE_URL: &str =
    "https://placehold.co/600x400?text=Image+unavailable";

/// Folder attachments are written to in object storage
pub const ATTACHMENT_FOLDER: &str = "tasks";

/// A local file the user picked to attach to a task
#[derive(Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for AttachmentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl AttachmentFile {
    /// Wraps raw bytes, inferring the content type from the file extension
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_owned();

        AttachmentFile {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Reads a file from disk
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} does not name a file", path.display()),
                )
            })?;
        let bytes = tokio::fs::read(path).await?;

        Ok(Self::new(file_name, bytes))
    }

    /// Where this file lands in object storage
    pub fn storage_path(&self) -> String {
        format!("{ATTACHMENT_FOLDER}/{}", self.file_name)
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Result of trying to turn a file into a durable URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success(String),
    /// The backend refused the upload for permission or quota reasons
    Unauthorized,
    Failure(String),
}

/// Non-blocking notice shown when an attachment could not be stored as requested
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum AttachmentNotice {
    #[display("Storage limit reached. The task was saved with a placeholder image.")]
    StorageLimitReached,
    #[display("The image could not be uploaded, so the task was saved without it ({_0}).")]
    UploadFailed(String),
}

/// The `imageUrl` to store on a task, plus any notice the user should see about it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedAttachment {
    pub image_url: String,
    pub notice: Option<AttachmentNotice>,
}

/// Which backend attachments go to, as named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachmentBackendKind {
    #[default]
    ObjectStorage,
    LinkHost,
    None,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("\"{0}\" is not an attachment backend, expected object_storage, link_host, or none")]
pub struct UnknownBackend(pub String);

impl FromStr for AttachmentBackendKind {
    type Err = UnknownBackend;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "object_storage" => Ok(Self::ObjectStorage),
            "link_host" => Ok(Self::LinkHost),
            "none" => Ok(Self::None),
            _ => Err(UnknownBackend(raw.to_owned())),
        }
    }
}

/// The attachment backend in use, holding the adapter that talks to it
pub enum AttachmentBackend<S, L> {
    ObjectStorage(S),
    LinkHost(L),
    None,
}

impl<S, L> AttachmentBackend<S, L> {
    pub fn kind(&self) -> AttachmentBackendKind {
        match self {
            Self::ObjectStorage(_) => AttachmentBackendKind::ObjectStorage,
            Self::LinkHost(_) => AttachmentBackendKind::LinkHost,
            Self::None => AttachmentBackendKind::None,
        }
    }
}

pub mod driven_ports {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Error)]
    pub enum AttachmentPortError {
        #[error("storage refused the attachment: {0}")]
        Unauthorized(String),
        #[error(transparent)]
        Failure(#[from] anyhow::Error),
    }

    pub trait ObjectStorage {
        /// Writes the file's bytes to [path]
        async fn put_object(
            &self,
            path: &str,
            file: &AttachmentFile,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), AttachmentPortError>;

        /// Resolves a publicly readable URL for an object that was just written
        async fn download_url(
            &self,
            path: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<String, AttachmentPortError>;
    }

    /// Body returned by the link host after a multipart upload
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    pub struct LinkHostResponse {
        pub success: bool,
        #[serde(default)]
        pub link: String,
    }

    pub trait LinkHost {
        async fn post_file(
            &self,
            file: &AttachmentFile,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<LinkHostResponse, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait AttachmentPort {
        /// False when no backend is configured and every attachment is dropped
        fn accepts_uploads(&self) -> bool;

        /// Uploads [file] to the configured backend. Never fails: every backend error is
        /// classified into the returned outcome.
        async fn upload(
            &self,
            file: &AttachmentFile,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> UploadOutcome;

        /// Produces the `imageUrl` for a task, applying the fallback policy to whatever the
        /// upload produced. A missing file or disabled backend yields an empty URL.
        async fn attach(
            &self,
            file: Option<&AttachmentFile>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> ResolvedAttachment;
    }
}

/// Uploads task attachments and downgrades every failure to a placeholder or empty URL, so
/// attachment trouble never blocks task creation
pub struct AttachmentService<S, L> {
    backend: AttachmentBackend<S, L>,
    placeholder_url: String,
}

impl<S, L> AttachmentService<S, L> {
    pub fn new(backend: AttachmentBackend<S, L>, placeholder_url: impl Into<String>) -> Self {
        AttachmentService {
            backend,
            placeholder_url: placeholder_url.into(),
        }
    }

    pub fn backend(&self) -> &AttachmentBackend<S, L> {
        &self.backend
    }

    /// Maps an upload outcome to the URL stored on the task
    pub fn resolve(&self, outcome: UploadOutcome) -> ResolvedAttachment {
        match outcome {
            UploadOutcome::Success(image_url) => ResolvedAttachment {
                image_url,
                notice: None,
            },
            UploadOutcome::Unauthorized => {
                warn!("Attachment storage refused the upload, using placeholder image");
                ResolvedAttachment {
                    image_url: self.placeholder_url.clone(),
                    notice: Some(AttachmentNotice::StorageLimitReached),
                }
            }
            UploadOutcome::Failure(reason) => {
                warn!("Attachment upload failed, saving task without an image: {reason}");
                ResolvedAttachment {
                    image_url: String::new(),
                    notice: Some(AttachmentNotice::UploadFailed(reason)),
                }
            }
        }
    }
}

async fn upload_to_object_storage(
    storage: &impl ObjectStorage,
    file: &AttachmentFile,
    ext_cxn: &mut impl ExternalConnectivity,
) -> Result<String, AttachmentPortError> {
    let path = file.storage_path();
    storage.put_object(&path, file, &mut *ext_cxn).await?;

    storage.download_url(&path, &mut *ext_cxn).await
}

impl<S, L> driving_ports::AttachmentPort for AttachmentService<S, L>
where
    S: ObjectStorage,
    L: LinkHost,
{
    fn accepts_uploads(&self) -> bool {
        !matches!(self.backend, AttachmentBackend::None)
    }

    async fn upload(
        &self,
        file: &AttachmentFile,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> UploadOutcome {
        match &self.backend {
            AttachmentBackend::ObjectStorage(storage) => {
                match upload_to_object_storage(storage, file, &mut *ext_cxn).await {
                    Ok(url) => UploadOutcome::Success(url),
                    Err(AttachmentPortError::Unauthorized(reason)) => {
                        debug!("Object storage refused {}: {reason}", file.file_name);
                        UploadOutcome::Unauthorized
                    }
                    Err(AttachmentPortError::Failure(err)) => {
                        UploadOutcome::Failure(format!("{err:#}"))
                    }
                }
            }
            AttachmentBackend::LinkHost(link_host) => {
                match link_host.post_file(file, &mut *ext_cxn).await {
                    Ok(response) if response.success && !response.link.is_empty() => {
                        UploadOutcome::Success(response.link)
                    }
                    Ok(_) => UploadOutcome::Failure("the link host rejected the upload".to_owned()),
                    Err(err) => UploadOutcome::Failure(format!("{err:#}")),
                }
            }
            AttachmentBackend::None => {
                UploadOutcome::Failure("attachments are disabled".to_owned())
            }
        }
    }

    async fn attach(
        &self,
        file: Option<&AttachmentFile>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> ResolvedAttachment {
        let Some(file) = file else {
            return ResolvedAttachment::default();
        };
        if !self.accepts_uploads() {
            debug!("Attachments are disabled, ignoring {}", file.file_name);
            return ResolvedAttachment::default();
        }

        let outcome = self.upload(file, &mut *ext_cxn).await;
        if let UploadOutcome::Success(ref url) = outcome {
            info!(url = %url, "uploaded attachment {}", file.file_name);
        }

        self.resolve(outcome)
    }
}
