//! Authorize URL building and redirect parsing

use crate::error::{AuthError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Url;
use spotlet_common::config::AuthConfig;

/// Provider authorization URL for the authorization-code flow
pub fn sign_in_url(config: &AuthConfig) -> Result<Url> {
    let scope = config.scopes.join(" ");
    let mut params = vec![
        ("response_type", "code"),
        ("client_id", config.client_id.as_str()),
        ("scope", scope.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];
    if config.show_dialog {
        params.push(("show_dialog", "TRUE"));
    }

    Url::parse_with_params(&config.authorize_url, &params)
        .map_err(|e| AuthError::Config(format!("authorize_url {:?}: {}", config.authorize_url, e)))
}

/// Extract the `code` query parameter from the URL the provider redirected to
pub fn code_from_redirect(redirect: &str) -> Option<String> {
    let url = Url::parse(redirect).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

/// `Authorization` header value carrying the client credentials
pub fn basic_authorization(client_id: &str, client_secret: &str) -> String {
    let encoded = STANDARD.encode(format!("{}:{}", client_id, client_secret));
    format!("Basic {}", encoded)
}
