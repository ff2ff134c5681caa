//! Role-based route guard and route table
//!
//! The guard is a pure function of the current [`Session`] and the roles a
//! route accepts. Callers match on the returned [`GuardDecision`] instead of
//! rendering anything here.

use std::collections::BTreeSet;
use std::fmt;

use super::roles::{RoleTag, User};
use super::session::Session;

/// Where a successful login lands when no original location was preserved
pub const DEFAULT_POST_LOGIN_PATH: &str = "/jobs";

/// Application routes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`, branches on role once authenticated
    Landing,
    Login,
    Register,
    Jobs,
    JobDetail(u64),
    Dashboard,
    ChangePassword,
}

/// Access rule attached to a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected(RouteAuthorization),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Jobs => "/jobs".to_string(),
            Route::JobDetail(id) => format!("/jobs/{}", id),
            Route::Dashboard => "/dashboard".to_string(),
            Route::ChangePassword => "/change-password".to_string(),
        }
    }

    /// Match a location (query string and fragment ignored)
    pub fn parse(location: &str) -> Option<Route> {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Route::Landing),
            ["login"] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            ["jobs"] => Some(Route::Jobs),
            ["jobs", id] => id.parse().ok().map(Route::JobDetail),
            ["dashboard"] => Some(Route::Dashboard),
            ["change-password"] => Some(Route::ChangePassword),
            _ => None,
        }
    }

    /// Roles each route accepts
    pub fn access(&self) -> Access {
        use RoleTag::*;
        match self {
            Route::Login | Route::Register => Access::Public,
            Route::Landing | Route::Jobs | Route::JobDetail(_) | Route::ChangePassword => {
                Access::Protected(RouteAuthorization::new([Freelancer, Client, Admin]))
            }
            Route::Dashboard => Access::Protected(RouteAuthorization::new([Freelancer, Admin])),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Roles allowed on a protected route, fixed at registration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAuthorization {
    allowed_roles: BTreeSet<RoleTag>,
}

impl RouteAuthorization {
    pub fn new(roles: impl IntoIterator<Item = RoleTag>) -> Self {
        Self {
            allowed_roles: roles.into_iter().collect(),
        }
    }

    /// Any authenticated role
    pub fn any_role() -> Self {
        Self::new(RoleTag::ALL)
    }

    pub fn allowed_roles(&self) -> &BTreeSet<RoleTag> {
        &self.allowed_roles
    }

    pub fn permits(&self, user: &User) -> bool {
        user.has_any_role(&self.allowed_roles)
    }
}

/// Outcome of guarding a protected route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still bootstrapping; render a neutral placeholder
    Pending,
    /// Render the protected content for `user`
    Allowed { user: User },
    /// Navigate to `target`; `from` is the location to return to after login
    Redirect { target: Route, from: Option<String> },
}

impl GuardDecision {
    fn redirect(target: Route) -> Self {
        GuardDecision::Redirect { target, from: None }
    }
}

/// Decide whether `location` may render under `authorization`
pub fn evaluate(
    session: &Session,
    authorization: &RouteAuthorization,
    location: &str,
) -> GuardDecision {
    if session.loading {
        return GuardDecision::Pending;
    }

    let Some(user) = &session.user else {
        return GuardDecision::Redirect {
            target: Route::Login,
            from: Some(location.to_string()),
        };
    };

    if user.roles.is_empty() {
        return GuardDecision::redirect(Route::Landing);
    }

    if authorization.permits(user) {
        return GuardDecision::Allowed { user: user.clone() };
    }

    if user.has_role(RoleTag::Client) {
        GuardDecision::redirect(Route::Jobs)
    } else {
        GuardDecision::redirect(Route::Landing)
    }
}

/// Where the landing route sends an authenticated user
pub fn landing_target(user: &User) -> Route {
    if user.has_role(RoleTag::Freelancer) {
        Route::Dashboard
    } else {
        Route::Jobs
    }
}

/// Where to go after a successful login
///
/// Returns the preserved location unless it is missing, not an absolute path,
/// or one of the auth pages themselves.
pub fn post_login_target(from: Option<&str>) -> String {
    from.filter(|path| path.starts_with('/'))
        .filter(|path| !matches!(Route::parse(path), Some(Route::Login | Route::Register)))
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_POST_LOGIN_PATH.to_string())
}

/// Result of resolving a location against the route table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Pending,
    /// Public page, rendered regardless of session
    Public(Route),
    /// Protected page the user may see
    Render { route: Route, user: User },
    Redirect { target: Route, from: Option<String> },
    /// Authenticated, but no route accepts this user's roles
    NoAccess { user: User },
}

/// Resolve `location` the way the application router does
///
/// Unknown locations redirect to `/`. The landing route never renders; it
/// forwards to the role's home page.
pub fn navigate(session: &Session, location: &str) -> Navigation {
    let Some(route) = Route::parse(location) else {
        return Navigation::Redirect {
            target: Route::Landing,
            from: None,
        };
    };

    let authorization = match route.access() {
        Access::Public => return Navigation::Public(route),
        Access::Protected(authorization) => authorization,
    };

    match evaluate(session, &authorization, location) {
        GuardDecision::Pending => Navigation::Pending,
        GuardDecision::Allowed { user } if route == Route::Landing => Navigation::Redirect {
            target: landing_target(&user),
            from: None,
        },
        GuardDecision::Allowed { user } => Navigation::Render { route, user },
        GuardDecision::Redirect {
            target: Route::Landing,
            ..
        } if route == Route::Landing => match &session.user {
            // Redirecting `/` to itself would loop
            Some(user) => Navigation::NoAccess { user: user.clone() },
            None => Navigation::Redirect {
                target: Route::Login,
                from: None,
            },
        },
        GuardDecision::Redirect { target, from } => Navigation::Redirect { target, from },
    }
}
