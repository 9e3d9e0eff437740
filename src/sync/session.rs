// In-process auth session state
use std::sync::RwLock;
use tracing::info;

use super::AuthSession;

/// Holds the signed-in user id, if any
#[derive(Debug, Default)]
pub struct SessionState {
    user: RwLock<Option<String>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-established session
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user: RwLock::new(Some(user_id.into())),
        }
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        info!(user_id = %user_id, "session started");
        match self.user.write() {
            Ok(mut user) => *user = Some(user_id),
            Err(poisoned) => *poisoned.into_inner() = Some(user_id),
        }
    }

    pub fn sign_out(&self) {
        info!("session ended");
        match self.user.write() {
            Ok(mut user) => *user = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl AuthSession for SessionState {
    fn is_active(&self) -> bool {
        self.user_id().is_some()
    }

    fn user_id(&self) -> Option<String> {
        match self.user.read() {
            Ok(user) => user.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
