/// API key for the Firebase project. Used by the identity provider and the document store.
pub const FIREBASE_API_KEY: &str = "FIREBASE_API_KEY";
/// ID of the Firebase project holding the "tasks" collection
pub const FIREBASE_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
/// Storage bucket for task attachments. Required when [ATTACHMENT_BACKEND] is "object_storage".
pub const FIREBASE_STORAGE_BUCKET: &str = "FIREBASE_STORAGE_BUCKET";
/// Which attachment backend to upload task images to: "object_storage", "link_host", or "none"
pub const ATTACHMENT_BACKEND: &str = "ATTACHMENT_BACKEND";
/// URL accepting multipart file uploads. Required when [ATTACHMENT_BACKEND] is "link_host".
pub const LINK_HOST_UPLOAD_URL: &str = "LINK_HOST_UPLOAD_URL";
/// Image URL stored on a task when object storage refuses the upload
pub const PLACEHOLDER_IMAGE_URL: &str = "PLACEHOLDER_IMAGE_URL";
/// When "true", a task cannot be submitted without an attached image
pub const REQUIRE_ATTACHMENT: &str = "REQUIRE_ATTACHMENT";
/// Log level configuration for the application. For formatting info, see [tracing_subscriber's EnvFilter documentation](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// Override for the identity provider's base URL, useful for pointing at an emulator
pub const IDENTITY_TOOLKIT_URL: &str = "IDENTITY_TOOLKIT_URL";
/// Override for the base URL of the service that renews the identity provider's ID tokens
pub const SECURE_TOKEN_URL: &str = "SECURE_TOKEN_URL";
/// Override for the document store's base URL
pub const FIRESTORE_URL: &str = "FIRESTORE_URL";
/// Override for the object storage base URL
pub const FIREBASE_STORAGE_URL: &str = "FIREBASE_STORAGE_URL";
