use crate::domain::filter::{self, CriteriaKey, FilterCriteria};
use crate::domain::session::Identity;
use crate::domain::session::driven_ports::IdentityProvider;
use crate::domain::session::driving_ports::SessionPort;
use crate::domain::task::Task;
use crate::domain::task::driven_ports::TaskReader;
use crate::domain::task::driving_ports::TaskPort;
use crate::external_connections::ExternalConnectivity;
use crate::routes::{self, Route, RouteDecision};
use tracing::error;

/// Choices offered by the priority filter, the blank one meaning any priority
pub const PRIORITY_FILTER_OPTIONS: [&str; 4] = ["", "Low", "Medium", "High"];

pub const EMPTY_STATE_MESSAGE: &str = "No tasks found. Try adjusting the filters.";

const NO_DUE_DATE: &str = "No Due Date";

/// The list of the signed-in user's tasks with its search, priority, and date filters
#[derive(Debug, Default)]
pub struct TaskListScreen {
    tasks: Vec<Task>,
    /// uid the cached tasks were fetched for
    cached_for: Option<String>,
    criteria: FilterCriteria,
}

impl TaskListScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the route guard and, when someone is signed in, fetches their tasks. A redirected
    /// screen issues no query and drops whatever it had cached.
    pub async fn open(
        &mut self,
        sessions: &impl SessionPort,
        ext_cxn: &mut impl ExternalConnectivity,
        provider: &impl IdentityProvider,
        tasks: &impl TaskPort,
        task_read: &impl TaskReader,
    ) -> RouteDecision {
        let current = sessions.current();
        let decision = routes::guard(Route::TaskList, current.as_ref());
        let (RouteDecision::Render(_), Some(owner)) = (decision, current) else {
            self.forget_cache();
            return decision;
        };
        self.keep_cache_only_for(&owner);

        match sessions.fresh_id_token(&mut *ext_cxn, provider).await {
            Ok(id_token) => ext_cxn.set_id_token(id_token),
            Err(err) => {
                error!("Could not renew the session credential: {err}");
                if sessions.current().is_none() {
                    self.forget_cache();
                    return RouteDecision::Redirect(Route::Auth);
                }
                return decision;
            }
        }
        self.refresh(&owner, ext_cxn, tasks, task_read).await;

        decision
    }

    /// Replaces the cached list with a fresh fetch. A failed fetch is logged and leaves the
    /// previous list in place, as long as that list belongs to [owner].
    pub async fn refresh(
        &mut self,
        owner: &Identity,
        ext_cxn: &mut impl ExternalConnectivity,
        tasks: &impl TaskPort,
        task_read: &impl TaskReader,
    ) {
        self.keep_cache_only_for(owner);
        match tasks.list_by_owner(owner, ext_cxn, task_read).await {
            Ok(fetched) => {
                self.tasks = fetched;
                self.cached_for = Some(owner.uid.clone());
            }
            Err(err) => error!("Error fetching tasks: {err}"),
        }
    }

    fn keep_cache_only_for(&mut self, owner: &Identity) {
        if self.cached_for.as_deref() != Some(owner.uid.as_str()) {
            self.forget_cache();
        }
    }

    fn forget_cache(&mut self) {
        self.tasks.clear();
        self.cached_for = None;
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn update_filter(&mut self, key: CriteriaKey, value: impl Into<String>) {
        self.criteria = self.criteria.with(key, value);
    }

    /// The cached tasks that pass the current filters, in fetch order
    pub fn visible(&self) -> Vec<&Task> {
        filter::apply(&self.tasks, &self.criteria)
    }

    /// Message shown in place of the list when no task passes the filters
    pub fn empty_state(&self) -> Option<&'static str> {
        self.visible().is_empty().then_some(EMPTY_STATE_MESSAGE)
    }
}

/// Due date as shown on a task card
pub fn due_date_label(task: &Task) -> String {
    match task.due_date {
        Some(due) => due.format("%Y-%m-%d").to_string(),
        None => NO_DUE_DATE.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::SessionService;
    use crate::domain::session::test_util::InMemoryIdentityProvider;
    use crate::domain::session::Credentials;
    use crate::domain::task::TaskService;
    use crate::domain::task::driving_ports::RepositoryError;
    use crate::domain::task::test_util::*;
    use crate::external_connections::test_util::FakeExternalConnectivity;
    use anyhow::anyhow;
    use speculoos::prelude::*;

    async fn signed_in_as_first_user() -> SessionService {
        let sessions = SessionService::new();
        let provider = InMemoryIdentityProvider::new_locked();
        let mut ext_cxn = FakeExternalConnectivity::new();
        sessions
            .sign_up(
                &Credentials {
                    email: "jane@example.com".to_owned(),
                    password: "hunter22".to_owned(),
                },
                &mut ext_cxn,
                &provider,
            )
            .await
            .expect("sign up should succeed");

        sessions
    }

    #[tokio::test]
    async fn redirects_without_session_and_issues_no_query() {
        let sessions = SessionService::new();
        let task_service = MockTaskService::new_locked();
        let task_persist = InMemoryTaskPersistence::new_locked();
        let mut ext_cxn = FakeExternalConnectivity::new();
        let mut screen = TaskListScreen::new();

        let decision = screen
            .open(
                &sessions,
                &mut ext_cxn,
                &InMemoryIdentityProvider::new_locked(),
                &task_service,
                &task_persist,
            )
            .await;

        assert_eq!(RouteDecision::Redirect(Route::Auth), decision);
        let locked_service = task_service.lock().expect("mock task service mutex poisoned");
        assert!(locked_service.list_by_owner_result.calls().is_empty());
    }

    #[tokio::test]
    async fn opening_fetches_only_the_owners_tasks() {
        let sessions = signed_in_as_first_user().await;
        let task_persist = RwLock::new(InMemoryTaskPersistence::new_with_tasks(&[
            task_owned_by("uid-1", "Buy milk"),
            task_owned_by("uid-2", "Somebody else's"),
            task_owned_by("uid-1", "Walk dog"),
        ]));
        let mut ext_cxn = FakeExternalConnectivity::new();
        let mut screen = TaskListScreen::new();

        let decision = screen
            .open(
                &sessions,
                &mut ext_cxn,
                &InMemoryIdentityProvider::new_locked(),
                &TaskService {},
                &task_persist,
            )
            .await;

        assert_eq!(RouteDecision::Render(Route::TaskList), decision);
        let titles: Vec<&str> = screen.tasks().iter().map(|task| task.title.as_str()).collect();
        assert_eq!(vec!["Buy milk", "Walk dog"], titles);
        assert_eq!(Some("token-for-uid-1".to_owned()), ext_cxn.id_token);
    }

    #[tokio::test]
    async fn filters_the_cached_list() {
        let sessions = signed_in_as_first_user().await;
        let task_persist = RwLock::new(InMemoryTaskPersistence::new_with_tasks(&[
            task_owned_by("uid-1", "Buy milk"),
            task_owned_by("uid-1", "Walk dog"),
        ]));
        let mut ext_cxn = FakeExternalConnectivity::new();
        let mut screen = TaskListScreen::new();
        screen
            .open(
                &sessions,
                &mut ext_cxn,
                &InMemoryIdentityProvider::new_locked(),
                &TaskService {},
                &task_persist,
            )
            .await;

        screen.update_filter(CriteriaKey::Search, "milk");
        let visible: Vec<&str> = screen.visible().into_iter().map(|task| task.title.as_str()).collect();
        assert_eq!(vec!["Buy milk"], visible);
        assert_that!(screen.empty_state()).is_none();

        screen.update_filter(CriteriaKey::Priority, "High");
        assert_eq!(Some(EMPTY_STATE_MESSAGE), screen.empty_state());
        assert_eq!("milk", screen.criteria().search);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_cache() {
        let owner = Identity {
            email: "jane@example.com".to_owned(),
            uid: "uid-1".to_owned(),
        };
        let task_service = MockTaskService::new_locked();
        task_service
            .lock()
            .expect("mock task service mutex poisoned")
            .list_by_owner_result
            .set_return_value(Ok(vec![task_owned_by("uid-1", "Buy milk")]));
        let task_persist = InMemoryTaskPersistence::new_locked();
        let mut ext_cxn = FakeExternalConnectivity::new();
        let mut screen = TaskListScreen::new();
        screen
            .refresh(&owner, &mut ext_cxn, &task_service, &task_persist)
            .await;
        assert_eq!(1, screen.tasks().len());

        task_service
            .lock()
            .expect("mock task service mutex poisoned")
            .list_by_owner_result
            .set_return_value(Err(RepositoryError::CommsFailure {
                action: "load your tasks",
                cause: anyhow!("offline"),
            }));
        screen
            .refresh(&owner, &mut ext_cxn, &task_service, &task_persist)
            .await;

        assert_eq!(1, screen.tasks().len());
        assert_eq!("Buy milk", screen.tasks()[0].title);
    }

    #[tokio::test]
    async fn failed_refresh_for_another_owner_shows_nothing_stale() {
        let alice = Identity {
            email: "alice@example.com".to_owned(),
            uid: "uid-a".to_owned(),
        };
        let bob = Identity {
            email: "bob@example.com".to_owned(),
            uid: "uid-b".to_owned(),
        };
        let task_service = MockTaskService::new_locked();
        task_service
            .lock()
            .expect("mock task service mutex poisoned")
            .list_by_owner_result
            .set_return_value(Ok(vec![task_owned_by("uid-a", "Alice secret")]));
        let task_persist = InMemoryTaskPersistence::new_locked();
        let mut ext_cxn = FakeExternalConnectivity::new();
        let mut screen = TaskListScreen::new();
        screen
            .refresh(&alice, &mut ext_cxn, &task_service, &task_persist)
            .await;
        assert_eq!(1, screen.visible().len());

        task_service
            .lock()
            .expect("mock task service mutex poisoned")
            .list_by_owner_result
            .set_return_value(Err(RepositoryError::CommsFailure {
                action: "load your tasks",
                cause: anyhow!("offline"),
            }));
        screen
            .refresh(&bob, &mut ext_cxn, &task_service, &task_persist)
            .await;

        assert!(screen.tasks().is_empty());
        assert_eq!(Some(EMPTY_STATE_MESSAGE), screen.empty_state());
    }

    #[tokio::test]
    async fn redirect_after_sign_out_drops_cached_tasks() {
        let sessions = signed_in_as_first_user().await;
        let task_persist = RwLock::new(InMemoryTaskPersistence::new_with_tasks(&[
            task_owned_by("uid-1", "Buy milk"),
        ]));
        let mut ext_cxn = FakeExternalConnectivity::new();
        let mut screen = TaskListScreen::new();
        screen
            .open(
                &sessions,
                &mut ext_cxn,
                &InMemoryIdentityProvider::new_locked(),
                &TaskService {},
                &task_persist,
            )
            .await;
        assert_eq!(1, screen.tasks().len());

        sessions.sign_out();
        let decision = screen
            .open(
                &sessions,
                &mut ext_cxn,
                &InMemoryIdentityProvider::new_locked(),
                &TaskService {},
                &task_persist,
            )
            .await;

        assert_eq!(RouteDecision::Redirect(Route::Auth), decision);
        assert!(screen.tasks().is_empty());
    }

    #[test]
    fn labels_due_dates() {
        let dated = task_owned_by("uid-1", "Buy milk");
        let undated = Task {
            due_date: None,
            ..task_owned_by("uid-1", "Walk dog")
        };

        assert_eq!("2024-01-01", due_date_label(&dated));
        assert_eq!("No Due Date", due_date_label(&undated));
    }

    #[test]
    fn offers_blank_priority_filter() {
        assert_eq!("", PRIORITY_FILTER_OPTIONS[0]);
        assert!(PRIORITY_FILTER_OPTIONS.contains(&"High"));
    }
}
