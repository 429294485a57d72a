//! Navigation: route table plus the guard run before every page transition.

mod guard;
mod routes;

use tracing::debug;

pub use guard::{Decision, HOME_PATH, LOGIN_PATH, SessionView, UNAUTHORIZED_PATH, evaluate};
pub use routes::{NOT_FOUND, ResolvedRoute, Route, RouteMeta, RouteTable};

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// The route the request resolved to.
    pub route: ResolvedRoute,
    /// What the guard decided.
    pub decision: Decision,
}

impl Navigation {
    /// Document title of the target page.
    #[must_use]
    pub const fn title(&self) -> Option<&'static str> {
        self.route.meta.title
    }

    /// Where the visitor ends up: the redirect target, or the requested page.
    #[must_use]
    pub fn destination(&self) -> String {
        self.decision
            .location()
            .unwrap_or_else(|| self.route.full_path.clone())
    }
}

/// Resolves paths and guards transitions.
#[derive(Debug, Clone)]
pub struct Router {
    table: RouteTable,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouteTable::storefront())
    }
}

impl Router {
    #[must_use]
    pub const fn new(table: RouteTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub const fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Resolve `path` and guard the transition against `session`.
    #[must_use]
    pub fn navigate(&self, path: &str, session: &impl SessionView) -> Navigation {
        let route = self.table.resolve(path);
        let decision = evaluate(&route.meta, session, &route.full_path);
        debug!(path, route = route.name, ?decision, "Navigation evaluated");
        Navigation { route, decision }
    }
}
