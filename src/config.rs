use crate::app_env;
use crate::domain::attachment::{AttachmentBackendKind, DEFAULT_PLACEHOLDER_IMAGE_URL};
use std::env;
use thiserror::Error;

const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com";
const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";
const DEFAULT_FIREBASE_STORAGE_URL: &str = "https://firebasestorage.googleapis.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the {0} environment variable must be set")]
    Missing(&'static str),
    #[error("the {variable} environment variable had an unusable value: {reason}")]
    Invalid {
        variable: &'static str,
        reason: String,
    },
}

/// Settings for the object storage attachment backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStorageConfig {
    pub base_url: String,
    pub bucket: String,
}

/// Settings for the multipart link-hosting attachment backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHostConfig {
    pub upload_url: String,
}

/// The attachment backend chosen at startup, along with whatever that backend needs to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentConfig {
    ObjectStorage(ObjectStorageConfig),
    LinkHost(LinkHostConfig),
    None,
}

/// Typed application configuration, read once at process start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_key: String,
    pub project_id: String,
    pub identity_toolkit_url: String,
    pub secure_token_url: String,
    pub firestore_url: String,
    pub attachments: AttachmentConfig,
    pub placeholder_image_url: String,
    pub require_attachment: bool,
}

impl AppConfig {
    /// Reads configuration from the process environment. Call [dotenv::dotenv] first if
    /// values should also come from a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let with_default = |name: &'static str, default: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        let backend_kind = match lookup(app_env::ATTACHMENT_BACKEND)
            .filter(|value| !value.trim().is_empty())
        {
            None => AttachmentBackendKind::default(),
            Some(raw) => raw.parse().map_err(|err| ConfigError::Invalid {
                variable: app_env::ATTACHMENT_BACKEND,
                reason: format!("{err}"),
            })?,
        };

        let attachments = match backend_kind {
            AttachmentBackendKind::ObjectStorage => {
                AttachmentConfig::ObjectStorage(ObjectStorageConfig {
                    base_url: with_default(
                        app_env::FIREBASE_STORAGE_URL,
                        DEFAULT_FIREBASE_STORAGE_URL,
                    ),
                    bucket: required(app_env::FIREBASE_STORAGE_BUCKET)?,
                })
            }
            AttachmentBackendKind::LinkHost => AttachmentConfig::LinkHost(LinkHostConfig {
                upload_url: required(app_env::LINK_HOST_UPLOAD_URL)?,
            }),
            AttachmentBackendKind::None => AttachmentConfig::None,
        };

        let require_attachment = match lookup(app_env::REQUIRE_ATTACHMENT) {
            None => false,
            Some(raw) => parse_flag(&raw).ok_or_else(|| ConfigError::Invalid {
                variable: app_env::REQUIRE_ATTACHMENT,
                reason: format!("expected true or false, got \"{raw}\""),
            })?,
        };
        if require_attachment && attachments == AttachmentConfig::None {
            return Err(ConfigError::Invalid {
                variable: app_env::REQUIRE_ATTACHMENT,
                reason: "an image cannot be required while the attachment backend is \"none\""
                    .to_owned(),
            });
        }

        Ok(AppConfig {
            api_key: required(app_env::FIREBASE_API_KEY)?,
            project_id: required(app_env::FIREBASE_PROJECT_ID)?,
            identity_toolkit_url: with_default(
                app_env::IDENTITY_TOOLKIT_URL,
                DEFAULT_IDENTITY_TOOLKIT_URL,
            ),
            secure_token_url: with_default(app_env::SECURE_TOKEN_URL, DEFAULT_SECURE_TOKEN_URL),
            firestore_url: with_default(app_env::FIRESTORE_URL, DEFAULT_FIRESTORE_URL),
            attachments,
            placeholder_image_url: with_default(
                app_env::PLACEHOLDER_IMAGE_URL,
                DEFAULT_PLACEHOLDER_IMAGE_URL,
            ),
            require_attachment,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}
