//! Minimal Authentication API
//!
//! Provides:
//! - User registration with Argon2id password hashing
//! - Login issuing signed, expiring JWT bearer tokens
//! - Logout acknowledgment for a valid bearer token
//! - Forgot/reset password with an emailed, time-limited token
//!
//! Tokens are stateless: nothing about an issued token is stored, so logout
//! and reset do not revoke a token before it expires.
//!
//! # Configuration
//!
//! All configuration is loaded once from environment variables:
//! - `SECRET_KEY` - Secret key for signing JWTs (required)
//! - `ALGORITHM` - HMAC algorithm, HS256/HS384/HS512 (default: HS256)
//! - `TOKEN_EXPIRES` - Login token lifetime in minutes (default: 30)
//! - `RESET_TOKEN_EXPIRES` - Reset token lifetime in minutes (default: `TOKEN_EXPIRES`)
//! - `APP_URL` - Base URL of the reset link (default: "http://localhost:3000")
//! - `MAIL_SERVER`, `MAIL_PORT`, `MAIL_USERNAME`, `MAIL_PASSWORD`, `MAIL_FROM` - SMTP relay
//! - `DATABASE_URL`, or `PG_USER`/`PG_PASSWORD`/`PG_HOST`/`PG_DATABASE`
//!
//! # Usage
//!
//! ```rust,ignore
//! use auth_api::{AuthConfig, AuthWorkflow, DeliveryQueue, MemoryUserStore};
//!
//! let (mailer, _worker) = DeliveryQueue::start(notifier);
//! let workflow = AuthWorkflow::new(AuthConfig::from_env()?, Arc::new(MemoryUserStore::new()), mailer)?;
//! let app = auth_api::create_routes(Arc::new(workflow));
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod password;
pub mod store;
pub mod token;
pub mod workflow;

// Re-export commonly used types
pub use config::{AuthConfig, MailConfig, ServerConfig};
pub use error::AuthError;
pub use extractors::ValidJson;
pub use handlers::{create_routes, AuthState};
pub use models::*;
pub use notifier::{DeliveryQueue, Notifier, ResetEmail, SmtpNotifier};
pub use password::PasswordHasher;
pub use store::{MemoryUserStore, PgUserStore, UserStore};
pub use token::{Claims, TokenService};
pub use workflow::AuthWorkflow;
