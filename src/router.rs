// src/router.rs
use crate::session::SessionState;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

impl Route {
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        match path {
            LOGIN_PATH => Some(Self::Login),
            DASHBOARD_PATH | "" => Some(Self::Dashboard),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => LOGIN_PATH,
            Self::Dashboard => DASHBOARD_PATH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Render(Route),
    Redirect(Route),
    /// Session still resolving; nothing is fetched.
    Placeholder,
    NotFound(String),
}

/// Decide what to show for `path`. The dashboard is only for signed-in users,
/// the login screen only for anonymous ones.
pub fn resolve(path: &str, state: &SessionState) -> RouteDecision {
    let Some(route) = Route::from_path(path) else {
        return RouteDecision::NotFound(path.to_string());
    };

    match (route, state) {
        (_, SessionState::Loading) => RouteDecision::Placeholder,
        (Route::Dashboard, SessionState::Anonymous) => RouteDecision::Redirect(Route::Login),
        (Route::Login, SessionState::Authenticated(_)) => {
            RouteDecision::Redirect(Route::Dashboard)
        }
        (route, _) => RouteDecision::Render(route),
    }
}
