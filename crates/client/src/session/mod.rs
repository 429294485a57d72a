//! Session state manager.
//!
//! Holds the signed-in identity and bearer token, mirrors both to the
//! key-value store, and publishes a [`SessionSnapshot`] after every change.
//!
//! The `(token, identity)` pair is all-or-nothing: every operation either
//! leaves both set or both cleared. A token without an identity is never
//! observable.

mod identity;
mod token;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use duka_core::Role;

use crate::api::{ApiError, AuthApi, AuthResponse, LoginRequest, RegisterRequest};
use crate::navigation::SessionView;
use crate::storage::{KeyValueStore, keys};
use crate::telemetry::{clear_sentry_user, set_sentry_user};

pub use identity::{Identity, IdentityPatch, PLACEHOLDER_INITIAL, initials};
pub use token::TokenHandle;

/// Point-in-time view of the session, published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Signed-in identity, if any.
    pub identity: Option<Identity>,
    /// Whether a token is held.
    pub authenticated: bool,
    /// A login or register request is in flight.
    pub loading: bool,
    /// Message of the last failed login or register.
    pub last_error: Option<String>,
}

impl SessionView for SessionSnapshot {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn is_admin(&self) -> bool {
        self.identity
            .as_ref()
            .is_some_and(|identity| identity.role.is_admin())
    }
}

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    loading: bool,
    last_error: Option<String>,
    /// Bumped whenever a session is installed or dropped.
    generation: u64,
}

/// Owns the current session.
pub struct SessionManager<A> {
    api: A,
    store: Arc<dyn KeyValueStore>,
    token: TokenHandle,
    state: Mutex<SessionState>,
    changes: watch::Sender<SessionSnapshot>,
}

impl<A> std::fmt::Debug for SessionManager<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("token", &self.token)
            .field(
                "state",
                &*self.state.lock().unwrap_or_else(PoisonError::into_inner),
            )
            .finish_non_exhaustive()
    }
}

impl<A: AuthApi> SessionManager<A> {
    /// Create an empty session.
    ///
    /// `token` is the handle the API client reads; the manager is its only
    /// writer.
    pub fn new(api: A, store: Arc<dyn KeyValueStore>, token: TokenHandle) -> Self {
        token.replace(None);
        let (changes, _) = watch::channel(SessionSnapshot::default());
        Self {
            api,
            store,
            token,
            state: Mutex::new(SessionState::default()),
            changes,
        }
    }

    /// Restore the session persisted by a previous run.
    ///
    /// Both the token and a valid identity must be present. Anything less
    /// clears the session and erases the persisted entries.
    #[instrument(skip(self))]
    pub fn hydrate(&self) {
        let token = self.read_key(keys::TOKEN).filter(|t| !t.trim().is_empty());
        let identity = self
            .read_key(keys::USER)
            .map(|raw| serde_json::from_str::<Identity>(&raw));

        match (token, identity) {
            (Some(token), Some(Ok(identity))) => {
                debug!(user_id = %identity.id, "Session restored");
                set_sentry_user(&identity.id, Some(identity.email.as_str()));
                {
                    let mut state = self.state();
                    state.generation = state.generation.wrapping_add(1);
                    state.identity = Some(identity);
                    self.token.replace(Some(SecretString::from(token)));
                }
                self.publish();
            }
            (None, None) => {
                self.clear();
            }
            (token, identity) => {
                match &identity {
                    Some(Err(e)) => {
                        warn!(error = %e, "Persisted identity is corrupt, clearing session");
                    }
                    _ => warn!(
                        has_token = token.is_some(),
                        has_identity = identity.is_some(),
                        "Partial session in storage, clearing session"
                    ),
                }
                self.clear();
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// On failure the previous session is left untouched and the message is
    /// recorded as [`SessionSnapshot::last_error`].
    ///
    /// # Errors
    ///
    /// Returns the gateway error if the backend rejects the credentials or
    /// cannot be reached.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<(), ApiError> {
        self.begin_request();
        let result = self.api.login(&request).await;
        self.finish_request(result)
    }

    /// Create an account and sign in to it.
    ///
    /// # Errors
    ///
    /// Returns the gateway error if registration fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<(), ApiError> {
        self.begin_request();
        let result = self.api.register(&request).await;
        self.finish_request(result)
    }

    /// Re-fetch the identity behind the current token.
    ///
    /// Does nothing without a token. A failed fetch means the token is stale
    /// or revoked, so the session is logged out.
    ///
    /// If the session is logged out or replaced while the fetch is in flight,
    /// the outcome belongs to a session that no longer exists and is dropped,
    /// success or failure alike.
    ///
    /// # Errors
    ///
    /// Returns the gateway error after logging out.
    #[instrument(skip(self))]
    pub async fn refresh_identity(&self) -> Result<(), ApiError> {
        let generation = {
            let state = self.state();
            if !self.token.is_present() {
                return Ok(());
            }
            state.generation
        };

        let result = self.api.fetch_profile().await;

        let mut state = self.state();
        if state.generation != generation {
            match &result {
                Ok(_) => debug!("Session changed during identity refresh, discarding profile"),
                Err(e) => debug!(error = %e, "Session changed during identity refresh, ignoring failure"),
            }
            return Ok(());
        }

        match result {
            Ok(identity) => {
                self.persist_identity(&identity);
                state.identity = Some(identity);
                drop(state);
                self.publish();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Identity refresh failed, logging out");
                self.reset(&mut state);
                drop(state);
                clear_sentry_user();
                self.publish();
                Err(e)
            }
        }
    }

    /// End the session and erase its persisted copy. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        if self.token.is_present() {
            info!("Logged out");
        }
        self.clear();
    }

    /// Merge `patch` into the current identity and re-persist it.
    ///
    /// Local only; the backend is not contacted. Returns `false` when no one
    /// is signed in.
    pub fn update_identity(&self, patch: IdentityPatch) -> bool {
        {
            let mut state = self.state();
            let Some(identity) = state.identity.as_mut() else {
                return false;
            };
            identity.apply(patch);
            self.persist_identity(identity);
        }
        self.publish();
        true
    }

    /// Forget the last login/register error.
    pub fn clear_error(&self) {
        let changed = self.state().last_error.take().is_some();
        if changed {
            self.publish();
        }
    }

    // =========================================================================
    // Derived state
    // =========================================================================

    /// Whether a session token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_present()
    }

    /// Whether the signed-in account is an admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state()
            .identity
            .as_ref()
            .is_some_and(|identity| identity.role.is_admin())
    }

    /// Whether the signed-in account is a customer.
    #[must_use]
    pub fn is_customer(&self) -> bool {
        self.state()
            .identity
            .as_ref()
            .is_some_and(|identity| identity.role == Role::Customer)
    }

    /// Up to two initials of the signed-in account's name.
    #[must_use]
    pub fn display_initials(&self) -> String {
        self.state()
            .identity
            .as_ref()
            .map_or_else(|| PLACEHOLDER_INITIAL.to_string(), Identity::initials)
    }

    /// The signed-in identity.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state().identity.clone()
    }

    /// Whether a login or register request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Message of the last failed login or register.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    /// Handle to the bearer token read by the API client.
    #[must_use]
    pub fn token(&self) -> &TokenHandle {
        &self.token
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.changes.borrow().clone()
    }

    /// Receive a new [`SessionSnapshot`] after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.changes.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_request(&self) {
        {
            let mut state = self.state();
            state.loading = true;
            state.last_error = None;
        }
        self.publish();
    }

    fn finish_request(&self, result: Result<AuthResponse, ApiError>) -> Result<(), ApiError> {
        match result {
            Ok(response) => {
                self.establish(response);
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "Authentication failed");
                {
                    let mut state = self.state();
                    state.loading = false;
                    state.last_error = Some(e.message());
                }
                self.publish();
                Err(e)
            }
        }
    }

    /// Install a freshly issued session in memory and in storage.
    ///
    /// The identity lands before the token, under the state lock.
    fn establish(&self, response: AuthResponse) {
        let AuthResponse { token, user, .. } = response;

        info!(user_id = %user.id, role = %user.role, "Signed in");
        set_sentry_user(&user.id, Some(user.email.as_str()));

        {
            let mut state = self.state();
            if let Err(e) = self.store.set(keys::TOKEN, &token) {
                warn!(error = %e, "Failed to persist session token");
            }
            self.persist_identity(&user);
            state.generation = state.generation.wrapping_add(1);
            state.identity = Some(user);
            state.loading = false;
            state.last_error = None;
            self.token.replace(Some(SecretString::from(token)));
        }
        self.publish();
    }

    fn persist_identity(&self, identity: &Identity) {
        let result = serde_json::to_string(identity)
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(keys::USER, &json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist identity");
        }
    }

    /// Drop the session everywhere.
    fn clear(&self) {
        self.reset(&mut self.state());
        clear_sentry_user();
        self.publish();
    }

    /// Drop the token before the identity, then the persisted copy.
    fn reset(&self, state: &mut SessionState) {
        self.token.replace(None);
        state.generation = state.generation.wrapping_add(1);
        state.identity = None;
        state.loading = false;
        state.last_error = None;
        for key in [keys::TOKEN, keys::USER] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to erase persisted session");
            }
        }
    }

    fn read_key(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap_or_else(|e| {
            warn!(key, error = %e, "Failed to read persisted session");
            None
        })
    }

    fn publish(&self) {
        let snapshot = {
            let state = self.state();
            SessionSnapshot {
                identity: state.identity.clone(),
                authenticated: self.token.is_present(),
                loading: state.loading,
                last_error: state.last_error.clone(),
            }
        };
        self.changes.send_replace(snapshot);
    }

    #[cfg(test)]
    fn token_value(&self) -> Option<String> {
        use secrecy::ExposeSecret;

        self.token
            .current()
            .map(|token| token.expose_secret().to_owned())
    }
}

impl<A: AuthApi> SessionView for SessionManager<A> {
    fn is_authenticated(&self) -> bool {
        Self::is_authenticated(self)
    }

    fn is_admin(&self) -> bool {
        Self::is_admin(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::VecDeque;

    use duka_core::Email;
    use tokio::sync::Notify;

    use super::*;
    use crate::storage::MemoryStore;

    /// Replays canned gateway responses in order.
    #[derive(Default)]
    struct ScriptedAuth {
        logins: Mutex<VecDeque<Result<AuthResponse, ApiError>>>,
        profiles: Mutex<VecDeque<Result<Identity, ApiError>>>,
        profile_calls: Mutex<usize>,
        profile_gate: Option<ProfileGate>,
    }

    /// Holds a profile fetch open until the test releases it.
    #[derive(Default)]
    struct ProfileGate {
        entered: Notify,
        release: Notify,
    }

    impl ScriptedAuth {
        fn gated(mut self) -> Self {
            self.profile_gate = Some(ProfileGate::default());
            self
        }

        fn gate(&self) -> &ProfileGate {
            self.profile_gate.as_ref().expect("fetch is not gated")
        }

        fn with_login(self, result: Result<AuthResponse, ApiError>) -> Self {
            self.logins.lock().unwrap().push_back(result);
            self
        }

        fn with_profile(self, result: Result<Identity, ApiError>) -> Self {
            self.profiles.lock().unwrap().push_back(result);
            self
        }
    }

    impl AuthApi for ScriptedAuth {
        async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, ApiError> {
            self.logins
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected login call")
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
            self.logins
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected register call")
        }

        async fn fetch_profile(&self) -> Result<Identity, ApiError> {
            *self.profile_calls.lock().unwrap() += 1;
            if let Some(gate) = &self.profile_gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            self.profiles
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected profile call")
        }
    }

    fn identity(name: &str, role: Role) -> Identity {
        serde_json::from_value(serde_json::json!({
            "id": "0b6f3a3e-54a4-4a55-9d3c-3d3f0c1a2b4c",
            "email": "amina@duka.co.ke",
            "full_name": name,
            "role": role,
            "created_at": "2025-01-05T09:30:00Z",
            "updated_at": "2025-01-05T09:30:00Z"
        }))
        .unwrap()
    }

    fn auth_ok(token: &str, role: Role) -> Result<AuthResponse, ApiError> {
        Ok(AuthResponse {
            message: "Login successful".to_string(),
            token: token.to_string(),
            user: identity("Amina Wanjiru", role),
        })
    }

    fn signed_in_as(token: &str, name: &str, role: Role) -> Result<AuthResponse, ApiError> {
        Ok(AuthResponse {
            message: "Login successful".to_string(),
            token: token.to_string(),
            user: identity(name, role),
        })
    }

    fn rejected() -> ApiError {
        ApiError::Status {
            status: 401,
            message: "Invalid email or password".to_string(),
        }
    }

    fn credentials() -> LoginRequest {
        LoginRequest {
            email: Email::parse("amina@duka.co.ke").unwrap(),
            password: "pa55word".to_string(),
        }
    }

    fn manager(api: ScriptedAuth, store: &Arc<MemoryStore>) -> SessionManager<ScriptedAuth> {
        let store: Arc<dyn KeyValueStore> = store.clone();
        SessionManager::new(api, store, TokenHandle::new())
    }

    fn persisted_session(store: &MemoryStore) {
        store
            .set(keys::TOKEN, "persisted-jwt")
            .unwrap();
        store
            .set(
                keys::USER,
                &serde_json::to_string(&identity("Amina Wanjiru", Role::Customer)).unwrap(),
            )
            .unwrap();
    }

    #[test]
    fn test_hydrate_restores_complete_session() {
        let store = Arc::new(MemoryStore::new());
        persisted_session(&store);
        let session = manager(ScriptedAuth::default(), &store);

        session.hydrate();

        assert!(session.is_authenticated());
        assert!(session.is_customer());
        assert_eq!(session.token_value().as_deref(), Some("persisted-jwt"));
        assert_eq!(session.display_initials(), "AW");
    }

    #[test]
    fn test_hydrate_token_without_identity_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::TOKEN, "orphan-jwt").unwrap();
        let session = manager(ScriptedAuth::default(), &store);

        session.hydrate();

        assert!(!session.is_authenticated());
        assert!(session.identity().is_none());
        assert!(!store.contains(keys::TOKEN));
    }

    #[test]
    fn test_hydrate_corrupt_identity_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::TOKEN, "jwt").unwrap();
        store.set(keys::USER, r#"{"id": "not-a-uuid"}"#).unwrap();
        let session = manager(ScriptedAuth::default(), &store);

        session.hydrate();

        assert!(!session.is_authenticated());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_login_sets_and_persists_session() {
        let store = Arc::new(MemoryStore::new());
        let session = manager(
            ScriptedAuth::default().with_login(auth_ok("jwt-1", Role::Admin)),
            &store,
        );

        session.login(credentials()).await.unwrap();

        assert!(session.is_authenticated());
        assert!(session.is_admin());
        assert!(!session.is_customer());
        assert_eq!(store.get(keys::TOKEN).unwrap().as_deref(), Some("jwt-1"));
        let stored: Identity = serde_json::from_str(&store.get(keys::USER).unwrap().unwrap()).unwrap();
        assert_eq!(stored.role, Role::Admin);

        let snapshot = session.snapshot();
        assert!(snapshot.authenticated);
        assert!(!snapshot.loading);
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_prior_session() {
        let store = Arc::new(MemoryStore::new());
        persisted_session(&store);
        let session = manager(ScriptedAuth::default().with_login(Err(rejected())), &store);
        session.hydrate();
        let before = session.identity();

        let err = session.login(credentials()).await.unwrap_err();

        assert_eq!(err.message(), "Invalid email or password");
        assert!(session.is_authenticated());
        assert_eq!(session.identity(), before);
        assert_eq!(session.token_value().as_deref(), Some("persisted-jwt"));
        assert_eq!(
            session.last_error().as_deref(),
            Some("Invalid email or password")
        );

        session.clear_error();
        assert!(session.snapshot().last_error.is_none());
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let store = Arc::new(MemoryStore::new());
        let session = manager(
            ScriptedAuth::default().with_login(auth_ok("jwt-new", Role::Customer)),
            &store,
        );

        session
            .register(RegisterRequest {
                email: Email::parse("amina@duka.co.ke").unwrap(),
                password: "pa55word".to_string(),
                full_name: "Amina Wanjiru".to_string(),
            })
            .await
            .unwrap();

        assert!(session.is_authenticated());
        assert!(session.is_customer());
        assert!(store.contains(keys::USER));
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let session = manager(ScriptedAuth::default(), &store);

        session.refresh_identity().await.unwrap();

        assert_eq!(*session.api.profile_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_replaces_identity_only() {
        let store = Arc::new(MemoryStore::new());
        persisted_session(&store);
        let session = manager(
            ScriptedAuth::default().with_profile(Ok(identity("Amina Otieno", Role::Admin))),
            &store,
        );
        session.hydrate();

        session.refresh_identity().await.unwrap();

        assert!(session.is_admin());
        assert_eq!(session.display_initials(), "AO");
        assert_eq!(session.token_value().as_deref(), Some("persisted-jwt"));
        let stored: Identity = serde_json::from_str(&store.get(keys::USER).unwrap().unwrap()).unwrap();
        assert_eq!(stored.full_name, "Amina Otieno");
    }

    #[tokio::test]
    async fn test_failed_refresh_logs_out() {
        let store = Arc::new(MemoryStore::new());
        persisted_session(&store);
        let session = manager(
            ScriptedAuth::default()
                .with_profile(Err(ApiError::Request("connection refused".to_string()))),
            &store,
        );
        session.hydrate();

        assert!(session.refresh_identity().await.is_err());

        assert!(!session.is_authenticated());
        assert!(session.identity().is_none());
        assert!(!store.contains(keys::TOKEN));
        assert!(!store.contains(keys::USER));
    }

    /// Logs out and signs in as someone else while a refresh is held open.
    async fn swap_session_during_refresh(
        session: &SessionManager<ScriptedAuth>,
    ) -> Result<(), ApiError> {
        let (refreshed, ()) = tokio::join!(session.refresh_identity(), async {
            session.api.gate().entered.notified().await;
            session.logout();
            session.login(credentials()).await.unwrap();
            session.api.gate().release.notify_one();
        });
        refreshed
    }

    #[tokio::test]
    async fn test_refresh_profile_is_dropped_after_session_change() {
        let store = Arc::new(MemoryStore::new());
        persisted_session(&store);
        let session = manager(
            ScriptedAuth::default()
                .gated()
                .with_profile(Ok(identity("Amina Old", Role::Customer)))
                .with_login(signed_in_as("jwt-next", "Baraka Mwangi", Role::Admin)),
            &store,
        );
        session.hydrate();

        swap_session_during_refresh(&session).await.unwrap();

        assert_eq!(session.token_value().as_deref(), Some("jwt-next"));
        assert_eq!(
            session.identity().map(|identity| identity.full_name),
            Some("Baraka Mwangi".to_string())
        );
        assert!(session.is_admin());
        let stored: Identity = serde_json::from_str(&store.get(keys::USER).unwrap().unwrap()).unwrap();
        assert_eq!(stored.full_name, "Baraka Mwangi");
        assert_eq!(session.snapshot().identity.map(|identity| identity.role), Some(Role::Admin));
    }

    #[tokio::test]
    async fn test_refresh_failure_does_not_end_newer_session() {
        let store = Arc::new(MemoryStore::new());
        persisted_session(&store);
        let session = manager(
            ScriptedAuth::default()
                .gated()
                .with_profile(Err(rejected()))
                .with_login(signed_in_as("jwt-next", "Baraka Mwangi", Role::Admin)),
            &store,
        );
        session.hydrate();

        swap_session_during_refresh(&session).await.unwrap();

        assert!(session.is_authenticated());
        assert!(session.is_admin());
        assert_eq!(session.token_value().as_deref(), Some("jwt-next"));
        assert_eq!(store.get(keys::TOKEN).unwrap().as_deref(), Some("jwt-next"));
        assert!(store.contains(keys::USER));
    }

    #[tokio::test]
    async fn test_subscribers_never_see_token_without_identity() {
        let store = Arc::new(MemoryStore::new());
        let session = manager(
            ScriptedAuth::default().with_login(auth_ok("jwt-1", Role::Customer)),
            &store,
        );
        let mut changes = session.subscribe();

        let watcher = async {
            let mut seen = Vec::new();
            while changes.changed().await.is_ok() {
                let snapshot = changes.borrow_and_update().clone();
                let done = snapshot.authenticated;
                seen.push(snapshot);
                if done {
                    break;
                }
            }
            seen
        };
        let (seen, ()) = tokio::join!(watcher, async {
            session.login(credentials()).await.unwrap();
        });

        assert!(!seen.is_empty());
        for snapshot in seen {
            assert_eq!(snapshot.authenticated, snapshot.identity.is_some());
        }
        assert!(session.is_authenticated());
        assert!(session.identity().is_some());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        persisted_session(&store);
        let session = manager(ScriptedAuth::default(), &store);
        session.hydrate();

        session.logout();
        let once = session.snapshot();
        session.logout();

        assert_eq!(session.snapshot(), once);
        assert_eq!(once, SessionSnapshot::default());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_identity() {
        let store = Arc::new(MemoryStore::new());
        let session = manager(ScriptedAuth::default(), &store);

        let patch = IdentityPatch {
            full_name: Some("Juma Kariuki".to_string()),
            ..Default::default()
        };
        assert!(!session.update_identity(patch.clone()));
        assert!(!store.contains(keys::USER));

        persisted_session(&store);
        session.hydrate();
        assert!(session.update_identity(patch));

        assert_eq!(session.display_initials(), "JK");
        let stored: Identity = serde_json::from_str(&store.get(keys::USER).unwrap().unwrap()).unwrap();
        assert_eq!(stored.full_name, "Juma Kariuki");
    }

    #[test]
    fn test_predicates_when_signed_out() {
        let session = manager(ScriptedAuth::default(), &Arc::new(MemoryStore::new()));
        assert!(!session.is_authenticated());
        assert!(!session.is_admin());
        assert!(!session.is_customer());
        assert_eq!(session.display_initials(), PLACEHOLDER_INITIAL);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = Arc::new(MemoryStore::new());
        let session = manager(
            ScriptedAuth::default().with_login(auth_ok("jwt-1", Role::Customer)),
            &store,
        );
        let mut rx = session.subscribe();

        session.login(credentials()).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().authenticated);

        session.logout();
        assert!(!rx.borrow_and_update().authenticated);
    }
}
