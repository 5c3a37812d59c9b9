//! Persisted session token, initial route, and the login/registration forms.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::graphql::{LoginInput, MutationPayload, RegisterInput};
use crate::navigation::{Navigate, Route};
use crate::notice::Notify;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Fill in all the fields!")]
    MissingFields,

    #[error("Give the event a title")]
    MissingTitle,

    #[error("This event can't be edited")]
    NotEditable,

    #[error("Still saving, please wait")]
    AlreadySubmitting,
}

impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        let kind = match e {
            FormError::MissingFields | FormError::MissingTitle => ErrorKind::Validation,
            FormError::NotEditable | FormError::AlreadySubmitting => ErrorKind::InvalidState,
        };
        AppError::new(kind, e.to_string())
    }
}

/// Token bytes read from the key-value store. Empty or non-UTF-8 values
/// count as no session.
#[must_use]
pub fn decode_token(bytes: Option<Vec<u8>>) -> Option<SecretString> {
    let token = String::from_utf8(bytes?).ok()?;
    if token.trim().is_empty() {
        return None;
    }
    Some(SecretString::new(token))
}

#[must_use]
pub const fn initial_route(has_token: bool) -> Route {
    if has_token {
        Route::Events
    } else {
        Route::Auth
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthFlow {
    Login,
    Register,
}

impl AuthFlow {
    const fn success_message(self) -> &'static str {
        match self {
            Self::Login => "You signed in successfully",
            Self::Register => "You registered successfully",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterField {
    Name,
    Email,
    Password,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub is_submitting: bool,
}

impl LoginForm {
    pub fn set(&mut self, field: LoginField, value: String) {
        match field {
            LoginField::Email => self.email = value,
            LoginField::Password => self.password = value,
        }
    }

    pub fn submit(&mut self) -> Result<LoginInput, FormError> {
        if self.is_submitting {
            return Err(FormError::AlreadySubmitting);
        }
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(FormError::MissingFields);
        }
        self.is_submitting = true;
        Ok(LoginInput {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("is_submitting", &self.is_submitting)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub is_submitting: bool,
}

impl RegisterForm {
    pub fn set(&mut self, field: RegisterField, value: String) {
        match field {
            RegisterField::Name => self.name = value,
            RegisterField::Email => self.email = value,
            RegisterField::Password => self.password = value,
        }
    }

    pub fn submit(&mut self) -> Result<RegisterInput, FormError> {
        if self.is_submitting {
            return Err(FormError::AlreadySubmitting);
        }
        if self.name.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty()
        {
            return Err(FormError::MissingFields);
        }
        self.is_submitting = true;
        Ok(RegisterInput {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

impl fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("is_submitting", &self.is_submitting)
            .finish_non_exhaustive()
    }
}

/// Resolves a login or registration response. Returns the new token when
/// the server accepted the credentials; the caller persists it.
pub fn complete_auth(
    flow: AuthFlow,
    result: Result<MutationPayload, AppError>,
    navigator: &mut impl Navigate,
    notify: &mut impl Notify,
) -> Option<SecretString> {
    let payload = match result {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(?flow, code = error.code(), "auth request failed");
            notify.report(&error);
            return None;
        }
    };

    if let Some(message) = payload.error.filter(|m| !m.is_empty()) {
        notify.report(&AppError::new(ErrorKind::Rejected, message));
        return None;
    }

    match payload.token.filter(|t| !t.is_empty()) {
        Some(token) => {
            notify.success(flow.success_message());
            navigator.reset(Route::Events);
            Some(SecretString::new(token))
        }
        None => {
            let error = AppError::new(ErrorKind::Deserialization, "auth payload without token");
            tracing::warn!(?flow, "auth payload carried neither token nor error");
            notify.report(&error);
            None
        }
    }
}
