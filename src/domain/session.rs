use crate::domain::session::driven_ports::IdentityProvider;
use crate::external_connections::ExternalConnectivity;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How long before expiry an ID token is renewed
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Refresh rejections after which the session can never be renewed again
const REVOKED_SESSION_CODES: [&str; 4] = [
    "TOKEN_EXPIRED",
    "USER_DISABLED",
    "USER_NOT_FOUND",
    "INVALID_REFRESH_TOKEN",
];

/// The authenticated user's email and unique identifier
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Identity {
    pub email: String,
    pub uid: String,
}

/// Short-lived ID token plus the long-lived refresh token that renews it
#[derive(Clone)]
pub struct SessionToken {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - TimeDelta::seconds(TOKEN_REFRESH_MARGIN_SECS) <= now
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("id_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// An identity plus the credentials the identity provider issued for it
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub identity: Identity,
    pub token: SessionToken,
}

/// Email and password as typed into the authentication form
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Failure reported by the identity provider. The message is shown to the user verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub mod driven_ports {
    use super::*;

    pub trait IdentityProvider {
        async fn sign_up(
            &self,
            credentials: &Credentials,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<AuthenticatedUser, AuthError>;

        async fn sign_in(
            &self,
            credentials: &Credentials,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<AuthenticatedUser, AuthError>;

        /// Trades a refresh token for a new ID token
        async fn refresh(
            &self,
            refresh_token: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<SessionToken, AuthError>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait SessionPort {
        async fn sign_up(
            &self,
            credentials: &Credentials,
            ext_cxn: &mut impl ExternalConnectivity,
            provider: &impl IdentityProvider,
        ) -> Result<Identity, AuthError>;

        async fn sign_in(
            &self,
            credentials: &Credentials,
            ext_cxn: &mut impl ExternalConnectivity,
            provider: &impl IdentityProvider,
        ) -> Result<Identity, AuthError>;

        /// Forgets the current identity and tells subscribers nobody is signed in
        fn sign_out(&self);

        fn current(&self) -> Option<Identity>;

        /// Credential for the current identity, if someone is signed in. May be expired; use
        /// [SessionPort::fresh_id_token] before talking to a backend.
        fn id_token(&self) -> Option<String>;

        /// Credential for the current identity, renewed through [provider] first when it is
        /// about to expire. A refresh the provider can never honor signs the user out.
        async fn fresh_id_token(
            &self,
            ext_cxn: &mut impl ExternalConnectivity,
            provider: &impl IdentityProvider,
        ) -> Result<Option<String>, AuthError>;

        /// Receives the current identity now and every time it changes
        fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
    }
}

/// Holds the authenticated identity for the lifetime of the process. Nothing is persisted, so a
/// restart always begins signed out.
pub struct SessionService {
    session: RwLock<Option<AuthenticatedUser>>,
    published: watch::Sender<Option<Identity>>,
}

impl SessionService {
    pub fn new() -> Self {
        let (published, _) = watch::channel(None);
        SessionService {
            session: RwLock::new(None),
            published,
        }
    }

    fn establish(&self, user: AuthenticatedUser) -> Identity {
        let identity = user.identity.clone();
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
        self.published.send_replace(Some(identity.clone()));

        identity
    }

    /// uid and refresh token of the current session when its ID token is about to expire
    fn expiring_session(&self, now: DateTime<Utc>) -> Option<(String, String)> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|user| user.token.needs_refresh(now))
            .map(|user| (user.identity.uid.clone(), user.token.refresh_token.clone()))
    }
}

impl Default for SessionService {
    fn default() -> Self {
        Self::new()
    }
}

impl driving_ports::SessionPort for SessionService {
    async fn sign_up(
        &self,
        credentials: &Credentials,
        ext_cxn: &mut impl ExternalConnectivity,
        provider: &impl IdentityProvider,
    ) -> Result<Identity, AuthError> {
        let user = provider.sign_up(credentials, &mut *ext_cxn).await?;
        info!(uid = %user.identity.uid, "account created");

        Ok(self.establish(user))
    }

    async fn sign_in(
        &self,
        credentials: &Credentials,
        ext_cxn: &mut impl ExternalConnectivity,
        provider: &impl IdentityProvider,
    ) -> Result<Identity, AuthError> {
        let user = provider.sign_in(credentials, &mut *ext_cxn).await?;
        info!(uid = %user.identity.uid, "signed in");

        Ok(self.establish(user))
    }

    fn sign_out(&self) {
        let previous = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(user) = previous {
            info!(uid = %user.identity.uid, "signed out");
        }
        self.published.send_replace(None);
    }

    fn current(&self) -> Option<Identity> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|user| user.identity.clone())
    }

    fn id_token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|user| user.token.id_token.clone())
    }

    async fn fresh_id_token(
        &self,
        ext_cxn: &mut impl ExternalConnectivity,
        provider: &impl IdentityProvider,
    ) -> Result<Option<String>, AuthError> {
        let Some((uid, refresh_token)) = self.expiring_session(Utc::now()) else {
            return Ok(driving_ports::SessionPort::id_token(self));
        };

        let refreshed = match provider.refresh(&refresh_token, &mut *ext_cxn).await {
            Ok(refreshed) => refreshed,
            Err(err) => {
                if REVOKED_SESSION_CODES
                    .iter()
                    .any(|code| err.message.starts_with(code))
                {
                    warn!(uid = %uid, "session can no longer be renewed: {err}");
                    driving_ports::SessionPort::sign_out(self);
                }
                return Err(err);
            }
        };

        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        match session.as_mut() {
            Some(user) if user.identity.uid == uid => {
                debug!(uid = %uid, expires_at = %refreshed.expires_at, "renewed session credential");
                user.token = refreshed;
                Ok(Some(user.token.id_token.clone()))
            }
            other => Ok(other.as_ref().map(|user| user.token.id_token.clone())),
        }
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.published.subscribe()
    }
}
