use crate::domain::session::Identity;
use tracing::debug;

/// Screens reachable by path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Auth,
    TaskList,
    AddTask,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Auth, Route::TaskList, Route::AddTask];

    pub fn path(&self) -> &'static str {
        match self {
            Self::Auth => "/",
            Self::TaskList => "/task",
            Self::AddTask => "/task/add",
        }
    }

    /// Looks up the route for a path. Anything unrecognized lands on the authentication screen.
    pub fn from_path(path: &str) -> Route {
        let trimmed = path.trim_end_matches('/');
        Route::ALL
            .into_iter()
            .find(|route| route.path().trim_end_matches('/') == trimmed)
            .unwrap_or(Route::Auth)
    }

    /// Whether the route works with tasks and so needs someone signed in
    pub fn requires_session(&self) -> bool {
        !matches!(self, Self::Auth)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Render(Route),
    Redirect(Route),
}

/// Decides whether [route] can render for [identity]. Evaluated synchronously before a screen
/// does any work, so a redirected screen never touches a backend.
pub fn guard(route: Route, identity: Option<&Identity>) -> RouteDecision {
    match (route.requires_session(), identity) {
        (true, None) => {
            debug!("No session, redirecting {} to the authentication screen", route.path());
            RouteDecision::Redirect(Route::Auth)
        }
        _ => RouteDecision::Render(route),
    }
}

/// Resolves a path and applies the guard in one step
pub fn navigate(path: &str, identity: Option<&Identity>) -> RouteDecision {
    guard(Route::from_path(path), identity)
}
