use crate::domain::ErrorState;
use crate::domain::attachment::driving_ports::AttachmentPort;
use crate::domain::attachment::{AttachmentFile, AttachmentNotice};
use crate::domain::session::driven_ports::IdentityProvider;
use crate::domain::session::driving_ports::SessionPort;
use crate::domain::submission::driving_ports::SubmissionPort;
use crate::domain::submission::{
    FormField, SubmissionOrchestrator, SubmissionOutcome, SubmissionState, TaskForm,
};
use crate::domain::task::Priority;
use crate::domain::task::driven_ports::TaskWriter;
use crate::domain::task::driving_ports::{RepositoryError, TaskPort};
use crate::external_connections::ExternalConnectivity;
use crate::routes::{self, Route, RouteDecision};

const INCOMPLETE_FORM: &str = "Please fill all the fields.";
const SUBMIT_FAILED: &str = "Error submitting task. Please try again later.";
const TASK_ADDED: &str = "Task added successfully!";

/// The "add task" form
#[derive(Debug)]
pub struct AddTaskScreen {
    form: TaskForm,
    orchestrator: SubmissionOrchestrator,
    errors: ErrorState,
    notice: Option<AttachmentNotice>,
    acknowledgment: Option<String>,
}

impl AddTaskScreen {
    /// [require_attachment] makes an image mandatory for every new task
    pub fn new(require_attachment: bool) -> Self {
        AddTaskScreen {
            form: TaskForm::default(),
            orchestrator: SubmissionOrchestrator::new(require_attachment),
            errors: ErrorState::default(),
            notice: None,
            acknowledgment: None,
        }
    }

    /// Runs the route guard. Without a session the screen also shows why it can't be used.
    pub fn open(&mut self, sessions: &impl SessionPort) -> RouteDecision {
        let decision = routes::guard(Route::AddTask, sessions.current().as_ref());
        if let RouteDecision::Redirect(_) = decision {
            self.errors.global_error = Some(RepositoryError::Unauthenticated.to_string());
        }

        decision
    }

    pub fn form(&self) -> &TaskForm {
        &self.form
    }

    pub fn errors(&self) -> &ErrorState {
        &self.errors
    }

    /// Notice about an attachment that could not be stored as picked
    pub fn notice(&self) -> Option<&AttachmentNotice> {
        self.notice.as_ref()
    }

    pub fn priority_options(&self) -> [Priority; 3] {
        Priority::ALL
    }

    pub fn update(&mut self, field: FormField, value: impl Into<String>) {
        self.form = self.form.with_field(field, value);
    }

    pub fn pick_image(&mut self, image: Option<AttachmentFile>) {
        self.form = self.form.with_image(image);
    }

    pub fn state(&self) -> SubmissionState {
        self.orchestrator.state()
    }

    pub fn submit_enabled(&self) -> bool {
        !self.state().is_busy()
    }

    pub fn submit_label(&self) -> &'static str {
        if self.state().is_busy() {
            "Submitting..."
        } else {
            "Add Task"
        }
    }

    /// Hands out the pending success message, if any, so it is shown once
    pub fn take_acknowledgment(&mut self) -> Option<String> {
        self.acknowledgment.take()
    }

    /// Submits the form for the signed-in user. On success the form goes back to its defaults;
    /// on failure the form is kept so the user can correct it and try again.
    pub async fn submit(
        &mut self,
        sessions: &impl SessionPort,
        ext_cxn: &mut impl ExternalConnectivity,
        provider: &impl IdentityProvider,
        attachments: &impl AttachmentPort,
        tasks: &impl TaskPort,
        task_write: &impl TaskWriter,
    ) -> SubmissionState {
        if !self.submit_enabled() {
            return self.state();
        }
        self.errors.clear();
        self.notice = None;
        self.acknowledgment = None;

        let Some(owner) = sessions.current() else {
            self.errors.global_error = Some(RepositoryError::Unauthenticated.to_string());
            return self.state();
        };
        match sessions.fresh_id_token(&mut *ext_cxn, provider).await {
            Ok(id_token) => ext_cxn.set_id_token(id_token),
            Err(err) => {
                self.errors.global_error = Some(match sessions.current() {
                    Some(_) => format!("{SUBMIT_FAILED} {err}"),
                    None => RepositoryError::Unauthenticated.to_string(),
                });
                return self.state();
            }
        }

        let outcome = self
            .orchestrator
            .submit(&self.form, &owner, ext_cxn, attachments, tasks, task_write)
            .await;
        match outcome {
            SubmissionOutcome::Created { notice, .. } => {
                self.form = TaskForm::default();
                self.notice = notice;
                self.acknowledgment = Some(TASK_ADDED.to_owned());
            }
            SubmissionOutcome::Invalid(field_errors) => {
                self.errors = ErrorState {
                    field_errors,
                    global_error: Some(INCOMPLETE_FORM.to_owned()),
                };
            }
            SubmissionOutcome::Failed(err) => {
                self.errors.global_error = Some(format!("{SUBMIT_FAILED} {err}"));
            }
        }

        self.state()
    }
}
