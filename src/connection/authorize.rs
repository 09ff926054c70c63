//! Authorization redirects for interactive schemes.

use crate::integration::Integration;
use crate::scheme::{ApplicationSpec, AuthScheme};

/// Path the callback receiver listens on, relative to the callback base URL.
pub(crate) const CALLBACK_PATH: &str = "/api/connections/callback";

/// Builds the URL the end user is sent to for authorization.
///
/// OAuth 2.0 follows the authorization code convention:
/// `{authorization_url}?client_id=…&redirect_uri=…&scope=…&state=…&response_type=code`.
/// OAuth 1.0a sends the consumer key and callback instead.
pub(crate) fn redirect_url(
    integration: &Integration,
    spec: Option<&ApplicationSpec>,
    callback_base_url: &str,
    state: &str,
) -> String {
    let config = &integration.scheme_config;
    let oauth = spec.and_then(|s| s.endpoints(integration.scheme));

    let authorization_url = config
        .get("authorization_url")
        .map(str::to_string)
        .or_else(|| oauth.map(|o| o.authorization_url.clone()))
        .unwrap_or_default();

    let redirect_uri = config
        .get("redirect_uri")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}{}", callback_base_url.trim_end_matches('/'), CALLBACK_PATH));

    let separator = if authorization_url.contains('?') { '&' } else { '?' };

    match integration.scheme {
        AuthScheme::OAuth1 => format!(
            "{}{}oauth_consumer_key={}&oauth_callback={}&state={}",
            authorization_url,
            separator,
            urlencoding::encode(config.get("consumer_key").unwrap_or_default()),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(state)
        ),
        _ => {
            let scopes = config
                .list("scopes")
                .or_else(|| oauth.map(|o| o.scopes.clone()))
                .unwrap_or_default()
                .join(" ");
            format!(
                "{}{}client_id={}&redirect_uri={}&scope={}&state={}&response_type=code",
                authorization_url,
                separator,
                urlencoding::encode(config.get("client_id").unwrap_or_default()),
                urlencoding::encode(&redirect_uri),
                urlencoding::encode(&scopes),
                urlencoding::encode(state)
            )
        }
    }
}

/// Keys a granted provider credential must carry for the scheme.
pub(crate) fn provider_fields(scheme: AuthScheme) -> &'static [&'static str] {
    match scheme {
        AuthScheme::OAuth2 => &["access_token"],
        AuthScheme::OAuth1 => &["oauth_token", "oauth_token_secret"],
        _ => &[],
    }
}
