use crate::domain::session::Identity;
use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::external_connections::ExternalConnectivity;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use derive_more::Display;
use std::str::FromStr;
use thiserror::Error;
use tracing::{error, info, warn};

/// Name of the document store collection holding tasks
pub const TASK_COLLECTION: &str = "tasks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Priority {
    #[display("Low")]
    Low,
    #[display("Medium")]
    Medium,
    #[display("High")]
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("\"{0}\" is not a priority, expected Low, Medium, or High")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == raw)
            .ok_or_else(|| UnknownPriority(raw.to_owned()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("\"{0}\" is not a date, expected YYYY-MM-DD")]
pub struct InvalidDueDate(pub String);

/// Normalizes a due date label into the timestamp stored on a task. Plain calendar dates
/// (`2024-01-01`) become midnight UTC on that day; full RFC 3339 timestamps are kept as-is.
pub fn normalize_due_date(label: &str) -> Result<DateTime<Utc>, InvalidDueDate> {
    let trimmed = label.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| InvalidDueDate(label.to_owned()))
}

/// A task as stored in the document store.
///
/// Documents written by older clients may lack fields, so `priority` and `due_date` are
/// optional and missing text fields read back as empty strings.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    pub image_url: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Validated task content ready to be written. Owner and creation time are stamped by
/// [TaskService].
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: DateTime<Utc>,
    pub image_url: String,
}

/// The record handed to the document store: a [Task] minus the store-assigned ID
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct NewTaskRecord {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: DateTime<Utc>,
    pub image_url: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

pub mod driven_ports {
    use super::*;

    pub trait TaskReader {
        /// Fetches the tasks whose `userId` equals [owner_uid]. Filtering must happen in the
        /// store, never after download.
        async fn tasks_for_owner(
            &self,
            owner_uid: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Task>, anyhow::Error>;
    }

    pub trait TaskWriter {
        /// Writes a new record and returns the ID the store assigned to it
        async fn create_task(
            &self,
            record: &NewTaskRecord,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<String, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    #[derive(Debug, Error)]
    pub enum RepositoryError {
        #[error("Please login to add tasks.")]
        Unauthenticated,
        #[error("failed to {action}: {cause:#}")]
        CommsFailure {
            action: &'static str,
            #[source]
            cause: anyhow::Error,
        },
    }

    impl RepositoryError {
        pub(super) fn from_write(cause: anyhow::Error) -> Self {
            Self::CommsFailure {
                action: "save the task",
                cause,
            }
        }

        pub(super) fn from_read(cause: anyhow::Error) -> Self {
            Self::CommsFailure {
                action: "load your tasks",
                cause,
            }
        }
    }

    #[cfg(test)]
    #[allow(clippy::items_after_test_module)]
    mod repository_error_clone {
        use super::RepositoryError;
        use anyhow::anyhow;

        impl Clone for RepositoryError {
            fn clone(&self) -> Self {
                match self {
                    Self::Unauthenticated => Self::Unauthenticated,
                    Self::CommsFailure { action, cause } => Self::CommsFailure {
                        action: *action,
                        cause: anyhow!(format!("{cause:#}")),
                    },
                }
            }
        }
    }

    pub trait TaskPort {
        /// Creates a task owned by [owner]. Every call creates a new record.
        async fn create(
            &self,
            draft: &TaskDraft,
            owner: &Identity,
            ext_cxn: &mut impl ExternalConnectivity,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<String, RepositoryError>;

        /// Lists the tasks owned by [owner] in the order the store returns them
        async fn list_by_owner(
            &self,
            owner: &Identity,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<Vec<Task>, RepositoryError>;
    }
}

use driving_ports::RepositoryError;

pub struct TaskService {}

impl driving_ports::TaskPort for TaskService {
    async fn create(
        &self,
        draft: &TaskDraft,
        owner: &Identity,
        ext_cxn: &mut impl ExternalConnectivity,
        task_write: &impl TaskWriter,
    ) -> Result<String, RepositoryError> {
        let record = NewTaskRecord {
            title: draft.title.clone(),
            description: draft.description.clone(),
            priority: draft.priority,
            due_date: draft.due_date,
            image_url: draft.image_url.clone(),
            user_id: owner.uid.clone(),
            created_at: Utc::now(),
        };

        let created_id = task_write
            .create_task(&record, &mut *ext_cxn)
            .await
            .map_err(|err| {
                error!("Task creation failure: {err:#}");
                RepositoryError::from_write(err)
            })?;
        info!(task_id = %created_id, uid = %owner.uid, "created task");

        Ok(created_id)
    }

    async fn list_by_owner(
        &self,
        owner: &Identity,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Vec<Task>, RepositoryError> {
        let fetched = task_read
            .tasks_for_owner(&owner.uid, &mut *ext_cxn)
            .await
            .map_err(|err| {
                error!("Task fetch failure: {err:#}");
                RepositoryError::from_read(err)
            })?;

        let fetched_count = fetched.len();
        let owned: Vec<Task> = fetched
            .into_iter()
            .filter(|task| task.user_id == owner.uid)
            .collect();
        if owned.len() != fetched_count {
            warn!(
                "Document store returned {} task(s) owned by someone else, discarding them",
                fetched_count - owned.len()
            );
        }
        info!(uid = %owner.uid, count = owned.len(), "fetched tasks");

        Ok(owned)
    }
}


#[cfg(test)]
pub mod test_util {
    use super::*;
    use crate::domain::session::Identity;
    use crate::domain::test_util::{Connectivity, FakeImplementation};
    use chrono::TimeZone;
    pub use std::sync::{Mutex, RwLock};

    pub struct InMemoryTaskPersistence {
        pub tasks: Vec<Task>,
        pub created_records: Vec<NewTaskRecord>,
        pub connected: Connectivity,
        /// Simulates a misbehaving store that ignores the owner filter
        pub ignore_owner_filter: bool,
        highest_task_id: usize,
    }

    impl InMemoryTaskPersistence {
        pub fn new() -> InMemoryTaskPersistence {
            InMemoryTaskPersistence {
                tasks: Vec::new(),
                created_records: Vec::new(),
                connected: Connectivity::Connected,
                ignore_owner_filter: false,
                highest_task_id: 0,
            }
        }

        pub fn new_with_tasks(tasks: &[Task]) -> InMemoryTaskPersistence {
            InMemoryTaskPersistence {
                tasks: tasks.to_vec(),
                highest_task_id: tasks.len(),
                ..Self::new()
            }
        }

        pub fn new_locked() -> RwLock<InMemoryTaskPersistence> {
            RwLock::new(Self::new())
        }
    }

    impl driven_ports::TaskReader for RwLock<InMemoryTaskPersistence> {
        async fn tasks_for_owner(
            &self,
            owner_uid: &str,
            _ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Task>, anyhow::Error> {
            let persistence = self.read().expect("task persist rw lock poisoned");
            persistence.connected.blow_up_if_disconnected()?;

            Ok(persistence
                .tasks
                .iter()
                .filter(|task| persistence.ignore_owner_filter || task.user_id == owner_uid)
                .cloned()
                .collect())
        }
    }

    impl driven_ports::TaskWriter for RwLock<InMemoryTaskPersistence> {
        async fn create_task(
            &self,
            record: &NewTaskRecord,
            _ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<String, anyhow::Error> {
            let mut persistence = self.write().expect("task persist rw lock poisoned");
            persistence.connected.blow_up_if_disconnected()?;

            persistence.highest_task_id += 1;
            let task_id = format!("task-{}", persistence.highest_task_id);
            persistence.created_records.push(record.clone());
            persistence.tasks.push(task_from_record(&task_id, record));

            Ok(task_id)
        }
    }

    pub fn task_from_record(task_id: &str, record: &NewTaskRecord) -> Task {
        Task {
            id: task_id.to_owned(),
            title: record.title.clone(),
            description: record.description.clone(),
            priority: Some(record.priority),
            due_date: Some(record.due_date),
            image_url: record.image_url.clone(),
            user_id: record.user_id.clone(),
            created_at: record.created_at,
        }
    }

    pub fn draft_with_title(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_owned(),
            description: "Something to do".to_owned(),
            priority: Priority::Low,
            due_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            image_url: String::new(),
        }
    }

    pub fn task_owned_by(uid: &str, title: &str) -> Task {
        Task {
            id: format!("{uid}-{title}"),
            title: title.to_owned(),
            description: String::new(),
            priority: Some(Priority::Low),
            due_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            image_url: String::new(),
            user_id: uid.to_owned(),
            created_at: Utc.with_ymd_and_hms(2023, 12, 1, 9, 0, 0).unwrap(),
        }
    }

    pub struct MockTaskService {
        pub create_result: FakeImplementation<(TaskDraft, Identity), Result<String, RepositoryError>>,
        pub list_by_owner_result: FakeImplementation<Identity, Result<Vec<Task>, RepositoryError>>,
    }

    impl MockTaskService {
        pub fn new() -> MockTaskService {
            MockTaskService {
                create_result: FakeImplementation::new(),
                list_by_owner_result: FakeImplementation::new(),
            }
        }

        pub fn new_locked() -> Mutex<MockTaskService> {
            Mutex::new(Self::new())
        }
    }

    impl driving_ports::TaskPort for Mutex<MockTaskService> {
        async fn create(
            &self,
            draft: &TaskDraft,
            owner: &Identity,
            _ext_cxn: &mut impl ExternalConnectivity,
            _task_write: &impl TaskWriter,
        ) -> Result<String, RepositoryError> {
            let mut locked_self = self.lock().expect("mock task service mutex poisoned");
            locked_self
                .create_result
                .save_arguments((draft.clone(), owner.clone()));

            locked_self.create_result.return_value()
        }

        async fn list_by_owner(
            &self,
            owner: &Identity,
            _ext_cxn: &mut impl ExternalConnectivity,
            _task_read: &impl TaskReader,
        ) -> Result<Vec<Task>, RepositoryError> {
            let mut locked_self = self.lock().expect("mock task service mutex poisoned");
            locked_self.list_by_owner_result.save_arguments(owner.clone());

            locked_self.list_by_owner_result.return_value()
        }
    }
}
