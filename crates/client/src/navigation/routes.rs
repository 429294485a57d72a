//! Storefront route table.
//!
//! # Routes
//!
//! ```text
//! /                    home
//! /products            products
//! /products/:id        product-detail
//! /checkout            checkout          (auth)
//! /login               login             (guest)
//! /register            register          (guest)
//! /profile             profile           (auth)
//! /orders              orders            (auth)
//! /orders/:id          order-detail      (auth)
//! /admin               admin             → /admin/dashboard
//! /admin/dashboard     admin-dashboard   (auth, admin)
//! /admin/products      admin-products    (auth, admin)
//! /admin/orders        admin-orders      (auth, admin)
//! /unauthorized        unauthorized
//! *                    not-found
//! ```

/// Flags and page metadata attached to a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    /// Document title.
    pub title: Option<&'static str>,
    /// Page description.
    pub description: Option<&'static str>,
    /// Only signed-in visitors may enter.
    pub requires_auth: bool,
    /// Only admins may enter.
    pub requires_admin: bool,
    /// Only signed-out visitors may enter.
    pub requires_guest: bool,
}

impl RouteMeta {
    const fn titled(title: &'static str) -> Self {
        Self {
            title: Some(title),
            description: None,
            requires_auth: false,
            requires_admin: false,
            requires_guest: false,
        }
    }

    const fn described(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    const fn auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    const fn admin(mut self) -> Self {
        self.requires_auth = true;
        self.requires_admin = true;
        self
    }

    const fn guest(mut self) -> Self {
        self.requires_guest = true;
        self
    }
}

/// A named route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    /// Path pattern; `:name` segments capture one path segment.
    pub pattern: &'static str,
    pub meta: RouteMeta,
    /// Path this route forwards to before guarding.
    pub redirect: Option<&'static str>,
}

impl Route {
    const fn page(name: &'static str, pattern: &'static str, meta: RouteMeta) -> Self {
        Self {
            name,
            pattern,
            meta,
            redirect: None,
        }
    }

    /// Captured parameters if `segments` match this route's pattern.
    fn matches(&self, segments: &[&str]) -> Option<Vec<(&'static str, String)>> {
        let pattern: Vec<&'static str> = split(self.pattern);
        if pattern.len() != segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (expected, actual) in pattern.into_iter().zip(segments) {
            if let Some(param) = expected.strip_prefix(':') {
                params.push((param, decode(actual)));
            } else if expected != *actual {
                return None;
            }
        }
        Some(params)
    }
}

/// Name of the catch-all route.
pub const NOT_FOUND: &str = "not-found";

/// A path matched against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub name: &'static str,
    /// Matched path, without the query string.
    pub path: String,
    /// Path plus query string, as requested (after redirects).
    pub full_path: String,
    pub params: Vec<(&'static str, String)>,
    pub meta: RouteMeta,
    /// The originally requested path, when a redirect was followed.
    pub redirected_from: Option<String>,
}

impl ResolvedRoute {
    /// Value of the `name` parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.name == NOT_FOUND
    }
}

/// Ordered list of routes; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
    not_found: RouteMeta,
}

/// Redirect chains longer than this are treated as loops.
const MAX_REDIRECTS: usize = 8;

impl RouteTable {
    /// Build a table from `routes`. Unmatched paths resolve to [`NOT_FOUND`].
    #[must_use]
    pub const fn new(routes: Vec<Route>, not_found: RouteMeta) -> Self {
        Self { routes, not_found }
    }

    /// The storefront's pages.
    #[must_use]
    pub fn storefront() -> Self {
        let admin_redirect = Route {
            name: "admin",
            pattern: "/admin",
            meta: RouteMeta::default().admin(),
            redirect: Some("/admin/dashboard"),
        };

        Self::new(
            vec![
                Route::page(
                    "products",
                    "/products",
                    RouteMeta::titled("Products - Duka")
                        .described("Browse our collection of products"),
                ),
                Route::page(
                    "home",
                    "/",
                    RouteMeta::titled("Home - Duka")
                        .described("Welcome to Duka, your online shop"),
                ),
                Route::page(
                    "product-detail",
                    "/products/:id",
                    RouteMeta::titled("Product Details - Duka"),
                ),
                Route::page("checkout", "/checkout", RouteMeta::titled("Checkout - Duka").auth()),
                Route::page("login", "/login", RouteMeta::titled("Sign In - Duka").guest()),
                Route::page("register", "/register", RouteMeta::titled("Sign Up - Duka").guest()),
                Route::page("profile", "/profile", RouteMeta::titled("My Profile - Duka").auth()),
                Route::page("orders", "/orders", RouteMeta::titled("My Orders - Duka").auth()),
                Route::page(
                    "order-detail",
                    "/orders/:id",
                    RouteMeta::titled("Order Details - Duka").auth(),
                ),
                admin_redirect,
                Route::page(
                    "admin-dashboard",
                    "/admin/dashboard",
                    RouteMeta::titled("Admin Dashboard - Duka").admin(),
                ),
                Route::page(
                    "admin-products",
                    "/admin/products",
                    RouteMeta::titled("Manage Products - Admin - Duka").admin(),
                ),
                Route::page(
                    "admin-orders",
                    "/admin/orders",
                    RouteMeta::titled("Manage Orders - Admin - Duka").admin(),
                ),
                Route::page(
                    "unauthorized",
                    "/unauthorized",
                    RouteMeta::titled("Unauthorized - Duka"),
                ),
            ],
            RouteMeta::titled("Page Not Found - Duka"),
        )
    }

    /// All routes, in match order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Route registered under `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }

    /// Match `full_path`, following redirect routes.
    ///
    /// The query string is ignored for matching and carried into
    /// [`ResolvedRoute::full_path`].
    #[must_use]
    pub fn resolve(&self, full_path: &str) -> ResolvedRoute {
        let mut current = normalize(full_path);
        let mut redirected_from = None;

        for _ in 0..MAX_REDIRECTS {
            let (path, query) = split_query(&current);
            let segments = split(path);

            let matched = self
                .routes
                .iter()
                .find_map(|route| route.matches(&segments).map(|params| (route, params)));

            match matched {
                Some((Route { redirect: Some(target), .. }, _)) => {
                    redirected_from.get_or_insert_with(|| current.clone());
                    current = match query {
                        Some(query) => format!("{target}?{query}"),
                        None => target.to_string(),
                    };
                }
                Some((route, params)) => {
                    return ResolvedRoute {
                        name: route.name,
                        path: path.to_string(),
                        full_path: current.clone(),
                        params,
                        meta: route.meta,
                        redirected_from,
                    };
                }
                None => return self.not_found(&current, redirected_from),
            }
        }

        self.not_found(&current, redirected_from)
    }

    fn not_found(&self, full_path: &str, redirected_from: Option<String>) -> ResolvedRoute {
        let (path, _) = split_query(full_path);
        ResolvedRoute {
            name: NOT_FOUND,
            path: path.to_string(),
            full_path: full_path.to_string(),
            params: vec![("path_match", path.trim_start_matches('/').to_string())],
            meta: self.not_found,
            redirected_from,
        }
    }
}

/// Ensure a leading slash and drop any trailing slash and fragment.
fn normalize(full_path: &str) -> String {
    let without_fragment = full_path.split('#').next().unwrap_or_default().trim();
    let (path, query) = split_query(without_fragment);

    let trimmed = path.trim_matches('/');
    let mut normalized = format!("/{trimmed}");
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        normalized.push('?');
        normalized.push_str(query);
    }
    normalized
}

fn split_query(full_path: &str) -> (&str, Option<&str>) {
    match full_path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (full_path, None),
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned())
}
