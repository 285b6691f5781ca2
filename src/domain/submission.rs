use crate::domain::FieldErrors;
use crate::domain::attachment::driving_ports::AttachmentPort;
use crate::domain::attachment::{AttachmentFile, AttachmentNotice};
use crate::domain::session::Identity;
use crate::domain::task::driven_ports::TaskWriter;
use crate::domain::task::driving_ports::{RepositoryError, TaskPort};
use crate::domain::task::{Priority, TaskDraft, normalize_due_date};
use crate::external_connections::ExternalConnectivity;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};
use validator::Validate;

/// Contents of the "add task" form. Every field is kept as typed so the screen can show it back.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct TaskForm {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required."))]
    pub description: String,
    #[validate(length(min = 1, message = "Priority is required."))]
    pub priority: String,
    #[validate(length(min = 1, message = "Due date is required."))]
    pub due_date: String,
    pub image: Option<AttachmentFile>,
}

impl Default for TaskForm {
    fn default() -> Self {
        TaskForm {
            title: String::new(),
            description: String::new(),
            priority: Priority::Low.to_string(),
            due_date: String::new(),
            image: None,
        }
    }
}

/// A field of [TaskForm], identified the same way in keyed updates and in [FieldErrors]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Priority,
    DueDate,
    Image,
}

impl FormField {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Priority => "priority",
            Self::DueDate => "dueDate",
            Self::Image => "image",
        }
    }

    fn from_struct_field(name: &str) -> Option<FormField> {
        match name {
            "title" => Some(Self::Title),
            "description" => Some(Self::Description),
            "priority" => Some(Self::Priority),
            "due_date" => Some(Self::DueDate),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("\"{0}\" is not a task form field")]
pub struct UnknownFormField(pub String);

impl FromStr for FormField {
    type Err = UnknownFormField;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "title" => Ok(Self::Title),
            "description" => Ok(Self::Description),
            "priority" => Ok(Self::Priority),
            "dueDate" => Ok(Self::DueDate),
            "image" => Ok(Self::Image),
            _ => Err(UnknownFormField(raw.to_owned())),
        }
    }
}

impl TaskForm {
    /// Returns a copy of this form with one text field replaced. The image is set through
    /// [TaskForm::with_image], so updating [FormField::Image] here only clears it.
    pub fn with_field(&self, field: FormField, value: impl Into<String>) -> TaskForm {
        let value = value.into();
        let mut updated = self.clone();
        match field {
            FormField::Title => updated.title = value,
            FormField::Description => updated.description = value,
            FormField::Priority => updated.priority = value,
            FormField::DueDate => updated.due_date = value,
            FormField::Image => updated.image = None,
        }

        updated
    }

    pub fn with_image(&self, image: Option<AttachmentFile>) -> TaskForm {
        TaskForm {
            image,
            ..self.clone()
        }
    }
}

/// Where a submission attempt currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Validating,
    Uploading,
    Writing,
    Done,
    Invalid,
    Failed,
}

impl SubmissionState {
    /// While busy, the submit control must stay disabled
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Validating | Self::Uploading | Self::Writing)
    }
}

#[derive(Debug)]
pub enum SubmissionOutcome {
    Created {
        task_id: String,
        notice: Option<AttachmentNotice>,
    },
    Invalid(FieldErrors),
    Failed(RepositoryError),
}

pub mod driving_ports {
    use super::*;

    pub trait SubmissionPort {
        fn state(&self) -> SubmissionState;

        /// Runs one attempt at creating a task from [form] on behalf of [owner]: validate, upload
        /// the attachment if there is one, then write. Attachment problems never stop the write.
        async fn submit(
            &mut self,
            form: &TaskForm,
            owner: &Identity,
            ext_cxn: &mut impl ExternalConnectivity,
            attachments: &impl AttachmentPort,
            tasks: &impl TaskPort,
            task_write: &impl TaskWriter,
        ) -> SubmissionOutcome;
    }
}

/// Drives a single "add task" form through validation, upload, and write, one step at a time
#[derive(Debug, Default)]
pub struct SubmissionOrchestrator {
    state: SubmissionState,
    require_attachment: bool,
    trail: Vec<SubmissionState>,
}

impl SubmissionOrchestrator {
    pub fn new(require_attachment: bool) -> Self {
        SubmissionOrchestrator {
            require_attachment,
            ..Self::default()
        }
    }

    /// Every state the most recent attempt passed through, in order
    pub fn trail(&self) -> &[SubmissionState] {
        &self.trail
    }

    fn enter(&mut self, state: SubmissionState) {
        debug!(from = ?self.state, to = ?state, "submission state change");
        self.state = state;
        self.trail.push(state);
    }

    fn validate(&self, form: &TaskForm) -> Result<(Priority, DateTime<Utc>), FieldErrors> {
        let mut field_errors = FieldErrors::new();

        if let Err(validation_errors) = form.validate() {
            for (field_name, errors) in validation_errors.field_errors() {
                let Some(field) = FormField::from_struct_field(field_name) else {
                    continue;
                };
                for error in errors.iter() {
                    let message = error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| format!("{} is invalid.", field.id()));
                    field_errors.insert(field.id(), message);
                }
            }
        }

        let priority = Priority::from_str(&form.priority);
        if priority.is_err() && !form.priority.is_empty() {
            field_errors.insert(
                FormField::Priority.id(),
                "Priority must be Low, Medium, or High.",
            );
        }

        let due_date = normalize_due_date(&form.due_date);
        if due_date.is_err() && !form.due_date.is_empty() {
            field_errors.insert(FormField::DueDate.id(), "Due date must be a valid date.");
        }

        if self.require_attachment && form.image.is_none() {
            field_errors.insert(FormField::Image.id(), "Image is required.");
        }

        match (priority, due_date) {
            (Ok(priority), Ok(due_date)) if field_errors.is_empty() => Ok((priority, due_date)),
            _ => Err(field_errors),
        }
    }
}

impl driving_ports::SubmissionPort for SubmissionOrchestrator {
    fn state(&self) -> SubmissionState {
        self.state
    }

    async fn submit(
        &mut self,
        form: &TaskForm,
        owner: &Identity,
        ext_cxn: &mut impl ExternalConnectivity,
        attachments: &impl AttachmentPort,
        tasks: &impl TaskPort,
        task_write: &impl TaskWriter,
    ) -> SubmissionOutcome {
        self.trail.clear();
        self.enter(SubmissionState::Validating);

        let (priority, due_date) = match self.validate(form) {
            Ok(parsed) => parsed,
            Err(field_errors) => {
                debug!("Task form rejected: {field_errors}");
                self.enter(SubmissionState::Invalid);
                return SubmissionOutcome::Invalid(field_errors);
            }
        };

        let resolved = match &form.image {
            Some(image) if attachments.accepts_uploads() => {
                self.enter(SubmissionState::Uploading);
                attachments.attach(Some(image), &mut *ext_cxn).await
            }
            _ => Default::default(),
        };

        self.enter(SubmissionState::Writing);
        let draft = TaskDraft {
            title: form.title.clone(),
            description: form.description.clone(),
            priority,
            due_date,
            image_url: resolved.image_url,
        };

        match tasks.create(&draft, owner, &mut *ext_cxn, task_write).await {
            Ok(task_id) => {
                self.enter(SubmissionState::Done);
                info!(task_id = %task_id, "task submitted");
                SubmissionOutcome::Created {
                    task_id,
                    notice: resolved.notice,
                }
            }
            Err(err) => {
                self.enter(SubmissionState::Failed);
                SubmissionOutcome::Failed(err)
            }
        }
    }
}
