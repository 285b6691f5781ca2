use crate::domain::session::driven_ports::IdentityProvider;
use crate::domain::session::{AuthError, AuthenticatedUser, Credentials, Identity, SessionToken};
use crate::external_connections::ExternalConnectivity;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Email/password accounts backed by the Identity Toolkit REST API, with ID tokens renewed
/// through the Secure Token API
pub struct FirebaseIdentityProvider {
    base_url: String,
    secure_token_url: String,
    api_key: String,
}

impl FirebaseIdentityProvider {
    pub fn new(base_url: &str, secure_token_url: &str, api_key: impl Into<String>) -> Self {
        FirebaseIdentityProvider {
            base_url: super::trim_base(base_url),
            secure_token_url: super::trim_base(secure_token_url),
            api_key: api_key.into(),
        }
    }

    async fn exchange(
        &self,
        operation: &str,
        credentials: &Credentials,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<AuthenticatedUser, AuthError> {
        let url = format!(
            "{}/v1/accounts:{operation}?key={}",
            self.base_url,
            urlencoding::encode(&self.api_key)
        );
        let response = ext_cxn
            .http_client()
            .post(url)
            .json(&PasswordRequest {
                email: &credentials.email,
                password: &credentials.password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|err| AuthError::new(format!("Could not reach the sign-in service: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Identity provider rejected {operation} with {status}: {body}");
            return Err(provider_error(status, &body));
        }

        let signed_in: PasswordResponse = response.json().await.map_err(|err| {
            AuthError::new(format!("Unexpected response from the sign-in service: {err}"))
        })?;

        Ok(AuthenticatedUser {
            identity: Identity {
                email: signed_in.email,
                uid: signed_in.local_id,
            },
            token: SessionToken {
                id_token: signed_in.id_token,
                refresh_token: signed_in.refresh_token,
                expires_at: expiry_after(&signed_in.expires_in)?,
            },
        })
    }
}

/// Turns the provider's token lifetime, a count of seconds sent as a string, into an instant
fn expiry_after(expires_in: &str) -> Result<DateTime<Utc>, AuthError> {
    let seconds: i64 = expires_in.trim().parse().map_err(|_| {
        AuthError::new(format!(
            "Unexpected token lifetime from the sign-in service: \"{expires_in}\""
        ))
    })?;

    Ok(Utc::now() + TimeDelta::seconds(seconds))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    email: String,
    local_id: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

/// The Secure Token API answers in snake_case, unlike the Identity Toolkit
#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

fn provider_error(status: reqwest::StatusCode, body: &str) -> AuthError {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => AuthError::new(parsed.error.message),
        Err(_) => AuthError::new(format!("Sign-in failed with status {status}")),
    }
}

impl IdentityProvider for FirebaseIdentityProvider {
    async fn sign_up(
        &self,
        credentials: &Credentials,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<AuthenticatedUser, AuthError> {
        self.exchange("signUp", credentials, ext_cxn).await
    }

    async fn sign_in(
        &self,
        credentials: &Credentials,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<AuthenticatedUser, AuthError> {
        self.exchange("signInWithPassword", credentials, ext_cxn)
            .await
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<SessionToken, AuthError> {
        let url = format!(
            "{}/v1/token?key={}",
            self.secure_token_url,
            urlencoding::encode(&self.api_key)
        );
        let response = ext_cxn
            .http_client()
            .post(url)
            .form(&RefreshRequest {
                grant_type: "refresh_token",
                refresh_token,
            })
            .send()
            .await
            .map_err(|err| AuthError::new(format!("Could not reach the sign-in service: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Secure token service rejected a refresh with {status}: {body}");
            return Err(provider_error(status, &body));
        }

        let refreshed: RefreshResponse = response.json().await.map_err(|err| {
            AuthError::new(format!("Unexpected response from the sign-in service: {err}"))
        })?;

        Ok(SessionToken {
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            expires_at: expiry_after(&refreshed.expires_in)?,
        })
    }
}
