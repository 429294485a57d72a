//! Navigation guard.
//!
//! A pure decision over the target route's flags and the session. Rules are
//! checked in order and the first failing one wins:
//!
//! 1. `requires_auth` and signed out → login, carrying the requested path
//! 2. `requires_admin` and not an admin → unauthorized
//! 3. `requires_guest` and signed in → home
//! 4. otherwise → allow

use super::routes::RouteMeta;

/// Login page path.
pub const LOGIN_PATH: &str = "/login";

/// Page shown when an account lacks the required role.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Home page path.
pub const HOME_PATH: &str = "/";

/// Session predicates the guard depends on.
pub trait SessionView {
    /// Whether a session token is held.
    fn is_authenticated(&self) -> bool;

    /// Whether the signed-in account is an admin.
    fn is_admin(&self) -> bool;
}

/// Outcome of guarding a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Proceed to the requested page.
    Allow,
    /// Sign in first, then return to `return_to`.
    RedirectToLogin { return_to: String },
    /// The account lacks the required role.
    RedirectToUnauthorized,
    /// Page is for signed-out visitors only.
    RedirectToHome,
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Where a redirect points, as a path with query string.
    ///
    /// `None` for [`Decision::Allow`].
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin { return_to } => Some(format!(
                "{LOGIN_PATH}?redirect={}",
                urlencoding::encode(return_to)
            )),
            Self::RedirectToUnauthorized => Some(UNAUTHORIZED_PATH.to_string()),
            Self::RedirectToHome => Some(HOME_PATH.to_string()),
        }
    }
}

/// Decide whether a navigation to `full_path` with `meta` may proceed.
#[must_use]
pub fn evaluate(meta: &RouteMeta, session: &impl SessionView, full_path: &str) -> Decision {
    if meta.requires_auth && !session.is_authenticated() {
        return Decision::RedirectToLogin {
            return_to: full_path.to_string(),
        };
    }

    if meta.requires_admin && !session.is_admin() {
        return Decision::RedirectToUnauthorized;
    }

    if meta.requires_guest && session.is_authenticated() {
        return Decision::RedirectToHome;
    }

    Decision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Session {
        authenticated: bool,
        admin: bool,
    }

    impl SessionView for Session {
        fn is_authenticated(&self) -> bool {
            self.authenticated
        }

        fn is_admin(&self) -> bool {
            self.admin
        }
    }

    const GUEST: Session = Session {
        authenticated: false,
        admin: false,
    };
    const CUSTOMER: Session = Session {
        authenticated: true,
        admin: false,
    };
    const ADMIN: Session = Session {
        authenticated: true,
        admin: true,
    };

    fn meta(requires_auth: bool, requires_admin: bool, requires_guest: bool) -> RouteMeta {
        RouteMeta {
            requires_auth,
            requires_admin,
            requires_guest,
            ..RouteMeta::default()
        }
    }

    #[test]
    fn test_requires_auth_redirects_to_login_with_return_path() {
        let decision = evaluate(&meta(true, false, false), &GUEST, "/orders/42?tab=items");
        assert_eq!(
            decision,
            Decision::RedirectToLogin {
                return_to: "/orders/42?tab=items".to_string()
            }
        );
        assert_eq!(
            decision.location().as_deref(),
            Some("/login?redirect=%2Forders%2F42%3Ftab%3Ditems")
        );
    }

    #[test]
    fn test_requires_admin() {
        let admin_page = meta(true, true, false);
        assert_eq!(
            evaluate(&admin_page, &CUSTOMER, "/admin/orders"),
            Decision::RedirectToUnauthorized
        );
        assert_eq!(evaluate(&admin_page, &ADMIN, "/admin/orders"), Decision::Allow);
    }

    #[test]
    fn test_auth_check_precedes_admin_check() {
        let decision = evaluate(&meta(true, true, false), &GUEST, "/admin");
        assert!(matches!(decision, Decision::RedirectToLogin { .. }));
    }

    #[test]
    fn test_admin_check_precedes_guest_check() {
        let decision = evaluate(&meta(false, true, true), &CUSTOMER, "/odd");
        assert_eq!(decision, Decision::RedirectToUnauthorized);
    }

    #[test]
    fn test_guest_only_pages() {
        let login = meta(false, false, true);
        assert_eq!(evaluate(&login, &CUSTOMER, "/login"), Decision::RedirectToHome);
        assert_eq!(evaluate(&login, &GUEST, "/login"), Decision::Allow);
        assert_eq!(Decision::RedirectToHome.location().as_deref(), Some("/"));
    }

    #[test]
    fn test_public_pages_allow_everyone() {
        let public = RouteMeta::default();
        for session in [&GUEST, &CUSTOMER, &ADMIN] {
            assert!(evaluate(&public, session, "/products").is_allowed());
        }
        assert_eq!(Decision::Allow.location(), None);
    }
}
