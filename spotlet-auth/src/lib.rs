//! spotlet-auth library - OAuth2 credential lifecycle
//!
//! Owns the access/refresh token pair for the music service:
//! - Authorization-code exchange and authorize URL building
//! - Expiry tracking with a look-ahead threshold
//! - Coalescing concurrent refresh requests into one exchange
//! - Persistence through a [`spotlet_common::CredentialStore`]

pub mod authorize;
pub mod credentials;
pub mod error;
pub mod token;
pub mod transport;

pub use credentials::{CredentialManager, RefreshOutcome};
pub use error::{AuthError, Result};
pub use token::{Credential, TokenResponse};
pub use transport::{ReqwestTransport, TokenRequest, TokenTransport};
