use std::sync::Arc;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::JwtKeys;
use crate::auth::{RegisterRequest, TokenPair};
use crate::error::AppError;
use crate::models::user::{PublicUser, RefreshTokenRecord, User};
use crate::store::{is_row_expired, Store};

/// Registration, login, and the refresh-token lifecycle.
///
/// A refresh token is valid only while BOTH its signature verifies and an
/// unexpired row for it exists in the store. The row is what makes rotation
/// single-use and logout a real revocation, despite the token itself being a
/// stateless signed blob.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    keys: Arc<JwtKeys>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, keys: Arc<JwtKeys>, bcrypt_cost: u32) -> Self {
        Self {
            store,
            keys,
            bcrypt_cost,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<PublicUser, AppError> {
        if let Some(existing) = self
            .store
            .user_by_email_or_username(&request.email, &request.username)
            .await?
        {
            let field = if existing.email == request.email {
                "email"
            } else {
                "username"
            };
            return Err(AppError::Conflict(format!(
                "User with this {} already exists",
                field
            )));
        }

        let password_hash = hash_password(&request.password, self.bcrypt_cost)?;
        let user = User::new(
            request.email,
            request.username,
            password_hash,
            request.first_name,
            request.last_name,
        );
        self.store.create_user(&user).await?;

        log::info!("user registered: {}", user.id);
        Ok(user.into())
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(PublicUser, TokenPair), AppError> {
        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".into()))?;

        if !verify_password(password, &user.password_hash)? {
            log::warn!("failed login attempt for {}", email);
            return Err(AppError::Authentication("Invalid email or password".into()));
        }

        let tokens = self.issue(&user).await?;
        log::info!("user logged in: {}", user.id);
        Ok((user.into(), tokens))
    }

    /// Signs a fresh access/refresh pair and persists the refresh token row.
    async fn issue(&self, user: &User) -> Result<TokenPair, AppError> {
        let access_token = self.keys.sign_access(user)?;
        let refresh_token = self.keys.sign_refresh(user)?;

        self.store
            .insert_refresh_token(&RefreshTokenRecord {
                token: refresh_token.clone(),
                user_id: user.id,
                expires_at: self.keys.refresh_expires_at(),
            })
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchanges a refresh token for a new pair. Single-use: the old row is
    /// removed with a conditional delete, so a second rotation of the same
    /// token, including a racing one, finds no row and is rejected.
    ///
    /// All four invalid cases (bad signature, expired signature, no row,
    /// row past its expiry) collapse into one indistinguishable 401.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let invalid = || AppError::Authentication("Invalid refresh token".into());

        let claims = self
            .keys
            .verify_refresh(refresh_token)
            .map_err(|_| invalid())?;

        let record = self
            .store
            .refresh_token(refresh_token)
            .await?
            .ok_or_else(invalid)?;

        if is_row_expired(&record, chrono::Utc::now()) {
            log::warn!("refresh token past stored expiry for user {}", record.user_id);
            return Err(invalid());
        }

        let user = self
            .store
            .user_by_id(claims.sub)
            .await?
            .ok_or_else(invalid)?;

        if !self.store.delete_refresh_token(refresh_token).await? {
            // Row vanished between the lookup and the delete: the token was
            // already rotated or revoked.
            log::warn!("refresh token reuse detected for user {}", user.id);
            return Err(invalid());
        }

        let tokens = self.issue(&user).await?;
        log::info!("refresh token rotated for user {}", user.id);
        Ok(tokens)
    }

    /// Revokes one session (matching token) or every session of the user.
    pub async fn logout(&self, user_id: Uuid, refresh_token: Option<&str>) -> Result<(), AppError> {
        match refresh_token {
            Some(token) => {
                self.store.delete_user_refresh_token(user_id, token).await?;
            }
            None => {
                self.store.delete_all_refresh_tokens(user_id).await?;
            }
        }
        log::info!("user logged out: {}", user_id);
        Ok(())
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<PublicUser>, AppError> {
        self.store.search_users(query).await
    }
}
