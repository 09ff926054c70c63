//! Built-in application catalog.

use super::{ApplicationSpec, AuthScheme, FieldSpec, Placement};

/// Applications known without any configuration.
pub fn builtin_applications() -> Vec<ApplicationSpec> {
    use AuthScheme::*;

    vec![
        ApplicationSpec::new("github", &[OAuth2, Bearer])
            .with_oauth(
                OAuth2,
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
                &["repo", "read:user"],
            )
            .with_probe(Bearer, "https://api.github.com/user"),
        ApplicationSpec::new("gmail", &[OAuth2]).with_oauth(
            OAuth2,
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
            &["https://www.googleapis.com/auth/gmail.readonly"],
        ),
        ApplicationSpec::new("slack", &[OAuth2, Bearer])
            .with_oauth(
                OAuth2,
                "https://slack.com/oauth/v2/authorize",
                "https://slack.com/api/oauth.v2.access",
                &["channels:read", "chat:write"],
            )
            .with_probe(Bearer, "https://slack.com/api/auth.test"),
        // Admin API keys are scoped to a single store, so the shop domain is required too.
        ApplicationSpec::new("shopify", &[ApiKey, OAuth2])
            .with_oauth(
                OAuth2,
                "https://accounts.shopify.com/oauth/authorize",
                "https://accounts.shopify.com/oauth/token",
                &["read_products", "read_orders"],
            )
            .with_fields(
                ApiKey,
                vec![
                    FieldSpec::secret("api_key", Placement::Header)
                        .described("Admin API access token"),
                    FieldSpec::public("shop", Placement::Query)
                        .described("Store domain, e.g. demo.myshopify.com"),
                ],
            ),
        ApplicationSpec::new("linear", &[ApiKey, OAuth2])
            .with_oauth(
                OAuth2,
                "https://linear.app/oauth/authorize",
                "https://api.linear.app/oauth/token",
                &["read"],
            )
            .with_fields(
                ApiKey,
                vec![FieldSpec::secret("api_key", Placement::Header)
                    .described("Personal API key, sent as the Authorization header")],
            ),
        ApplicationSpec::new("jira", &[Basic, OAuth2])
            .with_oauth(
                OAuth2,
                "https://auth.atlassian.com/authorize",
                "https://auth.atlassian.com/oauth/token",
                &["read:jira-work"],
            )
            .with_fields(
                Basic,
                vec![
                    FieldSpec::public("username", Placement::Header)
                        .described("Account email"),
                    FieldSpec::secret("password", Placement::Header)
                        .described("API token used as the basic auth password"),
                    FieldSpec::public("subdomain", Placement::Query)
                        .described("Site name in <subdomain>.atlassian.net"),
                ],
            ),
        ApplicationSpec::new("twitter", &[OAuth1, OAuth2, Bearer])
            .with_oauth(
                OAuth1,
                "https://api.twitter.com/oauth/authorize",
                "https://api.twitter.com/oauth/access_token",
                &[],
            )
            .with_oauth(
                OAuth2,
                "https://twitter.com/i/oauth2/authorize",
                "https://api.twitter.com/2/oauth2/token",
                &["tweet.read", "users.read"],
            ),
        ApplicationSpec::new("trello", &[OAuth1, ApiKey])
            .with_oauth(
                OAuth1,
                "https://trello.com/1/OAuthAuthorizeToken",
                "https://trello.com/1/OAuthGetAccessToken",
                &["read"],
            )
            .with_fields(
                ApiKey,
                vec![
                    FieldSpec::secret("api_key", Placement::Query),
                    FieldSpec::secret("token", Placement::Query),
                ],
            ),
        ApplicationSpec::new("metabase", &[BasicWithJwt]),
        ApplicationSpec::new("hackernews", &[NoAuth]),
    ]
}
