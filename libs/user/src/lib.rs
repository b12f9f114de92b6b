//! Courier User - typed client for the remote user service
//!
//! [`UserService`] is the contract callers program against.
//! [`RestUserService`] implements it on top of a
//! [`Dispatcher`](courier_fabric::Dispatcher) by posting to `users/login`.

use std::fmt;

use async_trait::async_trait;
use courier_core::{Outcome, Result, ServiceTarget};
use courier_fabric::codec::Codec;
use courier_fabric::Dispatcher;
use serde::{Deserialize, Serialize};
use tracing::info;

const SERVICE: &str = "users";
const LOGIN: &str = "login";

/// Credentials sent to `users/login`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoginRq {
    pub username: String,
    pub password: String,
}

impl UserLoginRq {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for UserLoginRq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserLoginRq")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session returned by a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoginRs {
    pub token: String,
}

#[async_trait]
pub trait UserService: Send + Sync {
    /// Log a user in.
    async fn login(&self, request: &UserLoginRq) -> Outcome<UserLoginRs>;
}

/// [`UserService`] backed by a [`Dispatcher`]
pub struct RestUserService<C> {
    dispatcher: Dispatcher<C>,
    login: ServiceTarget,
}

impl<C: Codec> RestUserService<C> {
    /// # Errors
    ///
    /// Returns [`courier_core::Error::InvalidTarget`] if the endpoint name is rejected.
    pub fn new(dispatcher: Dispatcher<C>) -> Result<Self> {
        let login = ServiceTarget::parse(SERVICE, LOGIN)?;
        Ok(Self { dispatcher, login })
    }

    /// Send `key` as the service key on every call
    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        self.login = self.login.with_service_key(key);
        self
    }
}

#[async_trait]
impl<C: Codec> UserService for RestUserService<C> {
    async fn login(&self, request: &UserLoginRq) -> Outcome<UserLoginRs> {
        let outcome = self.dispatcher.post(&self.login, request).await;
        info!(username = %request.username, outcome = %outcome.kind(), "login attempted");
        outcome
    }
}
