//! Authentication Workflow
//!
//! Register, login, logout, forgot-password and reset-password, built on the
//! user store, password hasher, token service and delivery queue.
//!
//! Tokens are stateless. Logout only checks that the presented token is
//! valid, and a reset token stays usable until it expires.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::*;
use crate::notifier::{render_reset_email, DeliveryQueue};
use crate::password::PasswordHasher;
use crate::store::UserStore;
use crate::token::{bearer_token, Claims, TokenService};

use chrono::{Datelike, Utc};
use std::sync::Arc;

/// Token type reported to clients
pub const TOKEN_TYPE: &str = "bearer";

/// Orchestrates the authentication lifecycle of a user
pub struct AuthWorkflow {
    config: AuthConfig,
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenService,
    mailer: DeliveryQueue,
}

impl AuthWorkflow {
    /// Create a workflow; fails with a configuration error if the token or
    /// hashing settings are unusable
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn UserStore>,
        mailer: DeliveryQueue,
    ) -> Result<Self, AuthError> {
        config.validate()?;
        let hasher = PasswordHasher::new(&config)?;
        let tokens = TokenService::new(&config)?;

        Ok(Self {
            config,
            store,
            hasher,
            tokens,
            mailer,
        })
    }

    /// Get reference to the token service
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    // ============================================
    // Registration
    // ============================================

    /// Register a new user with the default role
    pub async fn register(&self, req: RegisterRequest) -> Result<UserSummary, AuthError> {
        if self.store.find_by_email(&req.email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hash_password(req.password).await?;

        // Insert still enforces uniqueness for concurrent registrations.
        let user = self
            .store
            .insert(NewUser {
                name: req.name,
                email: req.email,
                password_hash,
                role: UserRole::default(),
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(UserSummary::from(&user))
    }

    // ============================================
    // Login / Logout
    // ============================================

    /// Verify credentials and issue an access token
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AuthError> {
        let user = self
            .store
            .find_by_email(&req.email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self
            .verify_password(req.password, user.password_hash.clone())
            .await?
        {
            tracing::warn!(user_id = %user.id, "Login failed: invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self
            .tokens
            .issue(Claims::new(&user.email), self.config.token_ttl()?)?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginResponse {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
            user: UserProfile::from(&user),
        })
    }

    /// Acknowledge logout for a valid bearer token.
    ///
    /// The token itself stays valid until it expires.
    pub async fn logout(&self, authorization: Option<&str>) -> Result<MessageResponse, AuthError> {
        let token = bearer_token(authorization)?;
        let claims = self.tokens.verify(token)?;

        tracing::info!(sub = %claims.sub, "User logged out");
        Ok(MessageResponse::new("User logged out successfully."))
    }

    // ============================================
    // Password Reset
    // ============================================

    /// Issue a reset token and queue the reset email.
    ///
    /// Returns once the email is queued, not once it is delivered.
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, AuthError> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = self
            .tokens
            .issue(Claims::new(&user.email), self.config.reset_token_ttl()?)?;

        let message = render_reset_email(&self.config.app_url, &token, &user.email, Utc::now().year());
        self.mailer.schedule(message)?;

        tracing::info!(user_id = %user.id, "Password reset email scheduled");
        Ok(MessageResponse::new("Password reset email sent successfully."))
    }

    /// Replace the password of the user named by `token`
    pub async fn reset_password(
        &self,
        token: &str,
        req: ResetPasswordRequest,
    ) -> Result<MessageResponse, AuthError> {
        if req.password != req.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let claims = self.tokens.verify(token)?;

        let user = self
            .store
            .find_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password_hash = self.hash_password(req.password).await?;
        self.store.update_password(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(MessageResponse::new("Password reset successful"))
    }

    // ============================================
    // Hashing Helpers
    // ============================================

    /// Hash on the blocking pool; Argon2 is CPU-bound
    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                tracing::error!("Password hashing task failed: {:?}", e);
                AuthError::Internal
            })?
    }

    /// Verify on the blocking pool
    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| {
                tracing::error!("Password verification task failed: {:?}", e);
                AuthError::Internal
            })
    }
}
