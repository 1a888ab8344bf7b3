use std::env;
use std::fmt::{Debug, Formatter};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::Error;

pub const USERNAME_ENV: &str = "EODDATA_USERNAME";
pub const PASSWORD_ENV: &str = "EODDATA_PASSWORD";

/// EODData account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read credentials from `EODDATA_USERNAME` / `EODDATA_PASSWORD`.
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self::new(read_env(USERNAME_ENV)?, read_env(PASSWORD_ENV)?))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn read_env(name: &str) -> Result<String, Error> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Authentication {
            message: format!("environment variable {name} is not set"),
            raw: None,
        })
}

/// Credentials plus the token of the current login, if any.
///
/// Authenticated calls go through [`Session::ensure_authenticated`], which
/// logs in once and hands back the cached token afterwards.
pub struct Session {
    credentials: Credentials,
    token: Mutex<Option<String>>,
}

impl Session {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            token: Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    /// Return the session token, running `login` first when there is none.
    pub fn ensure_authenticated<F>(&self, login: F) -> Result<String, Error>
    where
        F: FnOnce(&Credentials) -> Result<String, Error>,
    {
        let mut token = self.lock();
        if let Some(existing) = token.as_ref() {
            return Ok(existing.clone());
        }

        debug!("session has no token, logging in");
        let fresh = login(&self.credentials)?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }

    /// Forget the current token; the next authenticated call logs in again.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
