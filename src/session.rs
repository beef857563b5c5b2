//! Per-request view of the signed-in user.

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    remote::RemoteStore,
};

/// The authenticated identity plus the latest user snapshot read from the store.
///
/// The snapshot is never updated behind the caller's back: after any
/// operation that changes the balance, call [`Session::refresh`].
#[derive(Debug, Clone)]
pub struct Session {
    pub auth: AuthUser,
    pub user: User,
}

impl Session {
    pub async fn load(store: &dyn RemoteStore, auth: &AuthUser) -> AppResult<Self> {
        let user = fetch(store, auth).await?;
        Ok(Self {
            auth: auth.clone(),
            user,
        })
    }

    pub async fn refresh(&mut self, store: &dyn RemoteStore) -> AppResult<&User> {
        self.user = fetch(store, &self.auth).await?;
        Ok(&self.user)
    }

    pub fn balance(&self) -> i64 {
        self.user.balance
    }
}

async fn fetch(store: &dyn RemoteStore, auth: &AuthUser) -> AppResult<User> {
    store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))
}
