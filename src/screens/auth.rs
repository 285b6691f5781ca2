use crate::domain::session::driven_ports::IdentityProvider;
use crate::domain::session::driving_ports::SessionPort;
use crate::domain::session::{Credentials, Identity};
use crate::external_connections::ExternalConnectivity;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignUp,
    SignIn,
}

impl AuthMode {
    fn flipped(self) -> AuthMode {
        match self {
            Self::SignUp => Self::SignIn,
            Self::SignIn => Self::SignUp,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::SignUp => "Sign Up",
            Self::SignIn => "Sign In",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Email,
    Password,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("\"{0}\" is not an authentication form field")]
pub struct UnknownAuthField(pub String);

impl FromStr for AuthField {
    type Err = UnknownAuthField;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "email" => Ok(Self::Email),
            "password" => Ok(Self::Password),
            _ => Err(UnknownAuthField(raw.to_owned())),
        }
    }
}

/// The sign-up / sign-in screen
#[derive(Debug, Default)]
pub struct AuthScreen {
    form: Credentials,
    mode: AuthMode,
    loading: bool,
    error: Option<String>,
    acknowledgment: Option<String>,
}

impl AuthScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &Credentials {
        &self.form
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn update(&mut self, field: AuthField, value: impl Into<String>) {
        let value = value.into();
        self.form = match field {
            AuthField::Email => Credentials {
                email: value,
                ..self.form.clone()
            },
            AuthField::Password => Credentials {
                password: value,
                ..self.form.clone()
            },
        };
    }

    /// Switches between signing up and signing in. Ignored while a request is in flight.
    pub fn toggle_mode(&mut self) {
        if self.loading {
            return;
        }
        self.mode = self.mode.flipped();
    }

    pub fn heading(&self) -> &'static str {
        self.mode.label()
    }

    pub fn button_label(&self) -> &'static str {
        if self.loading {
            "Loading..."
        } else {
            self.mode.label()
        }
    }

    pub fn toggle_prompt(&self) -> &'static str {
        match self.mode {
            AuthMode::SignUp => "Already have an account?",
            AuthMode::SignIn => "Don't have an account?",
        }
    }

    /// Label of the control that switches to the other mode
    pub fn toggle_label(&self) -> &'static str {
        self.mode.flipped().label()
    }

    pub fn controls_enabled(&self) -> bool {
        !self.loading
    }

    /// Hands out the pending success message, if any, so it is shown once
    pub fn take_acknowledgment(&mut self) -> Option<String> {
        self.acknowledgment.take()
    }

    /// Sends the form to the identity provider in the current mode. On failure the provider's
    /// message is shown as-is and nothing is retried.
    pub async fn submit(
        &mut self,
        sessions: &impl SessionPort,
        ext_cxn: &mut impl ExternalConnectivity,
        provider: &impl IdentityProvider,
    ) -> Option<Identity> {
        if self.loading {
            return None;
        }
        self.error = None;
        self.loading = true;

        let auth_result = match self.mode {
            AuthMode::SignUp => sessions.sign_up(&self.form, &mut *ext_cxn, provider).await,
            AuthMode::SignIn => sessions.sign_in(&self.form, &mut *ext_cxn, provider).await,
        };
        self.loading = false;

        match auth_result {
            Ok(identity) => {
                ext_cxn.set_id_token(sessions.id_token());
                self.acknowledgment = Some(
                    match self.mode {
                        AuthMode::SignUp => "Account created successfully!",
                        AuthMode::SignIn => "Logged in successfully!",
                    }
                    .to_owned(),
                );
                Some(identity)
            }
            Err(err) => {
                warn!("{} attempt failed: {err}", self.mode.label());
                self.error = Some(err.message);
                None
            }
        }
    }
}
