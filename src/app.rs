use crate::config::{AppConfig, AttachmentConfig};
use crate::domain::attachment::{AttachmentBackend, AttachmentService};
use crate::domain::session::driving_ports::SessionPort;
use crate::domain::session::{Identity, SessionService};
use crate::domain::submission::SubmissionState;
use crate::domain::task::TaskService;
use crate::external_connections::ExternalConnectivity as _;
use crate::logging;
use crate::persistence::ExternalConnectivity;
use crate::persistence::attachment_driven_ports::{FirebaseObjectStorage, LinkHostUploader};
use crate::persistence::firestore_task_driven_ports::FirestoreTaskStore;
use crate::persistence::identity_driven_ports::FirebaseIdentityProvider;
use crate::routes::RouteDecision;
use crate::screens::add_task::AddTaskScreen;
use crate::screens::auth::AuthScreen;
use crate::screens::task_list::TaskListScreen;
use anyhow::Context;
use dotenv::dotenv;
use tracing::info;

pub type Attachments = AttachmentService<FirebaseObjectStorage, LinkHostUploader>;

/// Every handle the screens need, constructed once at process start and passed explicitly
pub struct App {
    pub config: AppConfig,
    pub ext_cxn: ExternalConnectivity,
    pub sessions: SessionService,
    pub identity_provider: FirebaseIdentityProvider,
    pub task_store: FirestoreTaskStore,
    pub task_service: TaskService,
    pub attachments: Attachments,
}

fn attachment_backend(
    config: &AttachmentConfig,
) -> AttachmentBackend<FirebaseObjectStorage, LinkHostUploader> {
    match config {
        AttachmentConfig::ObjectStorage(storage) => AttachmentBackend::ObjectStorage(
            FirebaseObjectStorage::new(&storage.base_url, &storage.bucket),
        ),
        AttachmentConfig::LinkHost(link_host) => {
            AttachmentBackend::LinkHost(LinkHostUploader::new(link_host.upload_url.clone()))
        }
        AttachmentConfig::None => AttachmentBackend::None,
    }
}

impl App {
    pub fn new(config: AppConfig) -> Result<App, anyhow::Error> {
        let ext_cxn = ExternalConnectivity::new()?;
        let attachments = AttachmentService::new(
            attachment_backend(&config.attachments),
            config.placeholder_image_url.clone(),
        );

        Ok(App {
            ext_cxn,
            sessions: SessionService::new(),
            identity_provider: FirebaseIdentityProvider::new(
                &config.identity_toolkit_url,
                &config.secure_token_url,
                config.api_key.clone(),
            ),
            task_store: FirestoreTaskStore::new(&config.firestore_url, &config.project_id),
            task_service: TaskService {},
            attachments,
            config,
        })
    }

    pub fn add_task_screen(&self) -> AddTaskScreen {
        AddTaskScreen::new(self.config.require_attachment)
    }

    pub async fn submit_auth(&mut self, screen: &mut AuthScreen) -> Option<Identity> {
        screen
            .submit(&self.sessions, &mut self.ext_cxn, &self.identity_provider)
            .await
    }

    pub async fn open_task_list(&mut self, screen: &mut TaskListScreen) -> RouteDecision {
        screen
            .open(
                &self.sessions,
                &mut self.ext_cxn,
                &self.identity_provider,
                &self.task_service,
                &self.task_store,
            )
            .await
    }

    pub async fn submit_task(&mut self, screen: &mut AddTaskScreen) -> SubmissionState {
        screen
            .submit(
                &self.sessions,
                &mut self.ext_cxn,
                &self.identity_provider,
                &self.attachments,
                &self.task_service,
                &self.task_store,
            )
            .await
    }

    pub fn sign_out(&mut self) {
        self.sessions.sign_out();
        self.ext_cxn.set_id_token(None);
    }
}

/// Loads `.env`, installs logging, reads configuration, and builds the [App]
pub fn bootstrap() -> Result<App, anyhow::Error> {
    dotenv().ok();
    logging::setup_logging(logging::init_env_filter());

    let config = AppConfig::from_env().context("reading configuration")?;
    let app = App::new(config)?;
    info!(
        project_id = %app.config.project_id,
        attachment_backend = ?app.attachments.backend().kind(),
        require_attachment = app.config.require_attachment,
        "starting task tracker"
    );

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkHostConfig;
    use crate::domain::attachment::AttachmentBackendKind;
    use crate::domain::submission::FormField;
    use crate::screens::auth::AuthField;
    use crate::routes::Route;
    use mockito::Matcher;
    use serde_json::json;

    fn config_for(server_url: &str, attachments: AttachmentConfig) -> AppConfig {
        AppConfig {
            api_key: "test-key".to_owned(),
            project_id: "demo".to_owned(),
            identity_toolkit_url: server_url.to_owned(),
            secure_token_url: server_url.to_owned(),
            firestore_url: server_url.to_owned(),
            attachments,
            placeholder_image_url: "https://example.com/placeholder.png".to_owned(),
            require_attachment: false,
        }
    }

    #[test]
    fn builds_configured_attachment_backend() {
        let app = App::new(config_for(
            "http://localhost:9099",
            AttachmentConfig::LinkHost(LinkHostConfig {
                upload_url: "http://localhost:9100/upload".to_owned(),
            }),
        ))
        .expect("app should build");

        assert_eq!(
            AttachmentBackendKind::LinkHost,
            app.attachments.backend().kind()
        );
        assert!(app.add_task_screen().submit_enabled());
    }

    #[tokio::test]
    async fn sign_up_add_and_list_against_backends() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/accounts:signUp")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "idToken": "tok",
                    "email": "jane@example.com",
                    "localId": "u1",
                    "refreshToken": "refresh",
                    "expiresIn": "3600",
                })
                .to_string(),
            )
            .create_async()
            .await;
        let create = server
            .mock("POST", Matcher::Regex(r"/documents/tasks$".to_owned()))
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(json!({
                "fields": { "userId": { "stringValue": "u1" } }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "name": "projects/demo/databases/(default)/documents/tasks/t1" })
                    .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", Matcher::Regex(r"/documents:runQuery$".to_owned()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "document": {
                        "name": "projects/demo/databases/(default)/documents/tasks/t1",
                        "fields": {
                            "title": { "stringValue": "Buy milk" },
                            "userId": { "stringValue": "u1" },
                        }
                    }
                }])
                .to_string(),
            )
            .create_async()
            .await;
        let mut app = App::new(config_for(&server.url(), AttachmentConfig::None))
            .expect("app should build");

        let mut list = TaskListScreen::new();
        assert_eq!(
            RouteDecision::Redirect(Route::Auth),
            app.open_task_list(&mut list).await
        );

        let mut auth = AuthScreen::new();
        auth.update(AuthField::Email, "jane@example.com");
        auth.update(AuthField::Password, "hunter22");
        let identity = app.submit_auth(&mut auth).await;
        assert_eq!(Some("u1".to_owned()), identity.map(|identity| identity.uid));

        let mut add = app.add_task_screen();
        assert_eq!(RouteDecision::Render(Route::AddTask), add.open(&app.sessions));
        add.update(FormField::Title, "Buy milk");
        add.update(FormField::Description, "2%");
        add.update(FormField::DueDate, "2024-01-01");
        assert_eq!(SubmissionState::Done, app.submit_task(&mut add).await);
        create.assert_async().await;

        assert_eq!(
            RouteDecision::Render(Route::TaskList),
            app.open_task_list(&mut list).await
        );
        assert_eq!(1, list.tasks().len());
        assert_eq!("t1", list.tasks()[0].id);

        app.sign_out();
        assert_eq!(
            RouteDecision::Redirect(Route::Auth),
            app.open_task_list(&mut list).await
        );
    }
}
