//! Login state.
//!
//! A session exists only after a successful login and lives until the
//! process exits. There is no logout.

use crate::{
    error::{Error, Result},
    gateway::Api,
    protocol::user::User,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Exchanges credentials for a user token.
    ///
    /// The session is left unchanged on any failure.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` when a user is logged in already, and the
    /// error of the exchange when it fails or yields no user id.
    pub async fn login(&mut self, api: &mut dyn Api, email: &str, password: &str) -> Result<&User> {
        if let Some(ref user) = self.user {
            return Err(Error::already_exists(format!(
                "already logged in as {} ({})",
                user.name, user.user_id
            )));
        }

        let user = api.login(email, password).await?;
        if user.user_id.is_empty() {
            return Err(Error::unauthenticated("login response has no user id"));
        }

        info!("logged in as {} ({})", user.name, user.user_id);
        Ok(self.user.insert(user))
    }
}
