//! Integration tests against a mock WordPress OAuth Server.

#[cfg(test)]
mod integration_tests {
    use crate::{
        IdentityError, IdentityProvider, IdentityResult, TokenResponse, UserId, VerifiedIdentity,
        WordPressError, WordPressOptions, WordPressProfile, WordPressStrategy,
    };
    use ras_identity_oauth2::{OAuth2Error, OAuth2Response};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("ras_identity_wordpress=debug,ras_identity_oauth2=debug")
            .with_test_writer()
            .try_init();
    }

    fn options_for(server: &MockServer) -> WordPressOptions {
        WordPressOptions::builder()
            .wordpress_url(server.uri())
            .client_id("123-456-789")
            .client_secret("shhh-its-a-secret")
            .callback_url("https://www.example.net/auth/wordpress/callback")
            .build()
    }

    async fn accept_all(
        _tokens: TokenResponse,
        profile: WordPressProfile,
    ) -> IdentityResult<Option<VerifiedIdentity>> {
        Ok(Some(profile.into()))
    }

    fn strategy_for(server: &MockServer) -> WordPressStrategy {
        WordPressStrategy::new(options_for(server), accept_all).unwrap()
    }

    fn jane_doe() -> serde_json::Value {
        serde_json::json!({
            "ID": 42,
            "display_name": "Jane Doe",
            "user_email": "jane@example.com"
        })
    }

    fn has_authorization_header(request: &Request) -> bool {
        request.headers.contains_key("authorization")
    }

    fn access_tokens(request: &Request) -> Vec<String> {
        request
            .url
            .query_pairs()
            .filter(|(k, _)| k == "access_token")
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_user_profile_maps_response() {
        init_tracing();
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/oauth/me/"))
            .and(query_param("access_token", "valid_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jane_doe()))
            .expect(1)
            .mount(&server)
            .await;

        let strategy = strategy_for(&server);
        let profile = strategy.user_profile("valid_token").await.unwrap();

        assert_eq!(profile.provider(), "WordPress-OAuth-Server");
        assert_eq!(profile.id(), &UserId::Numeric(42));
        assert_eq!(profile.display_name(), "Jane Doe");
        assert_eq!(profile.emails().len(), 1);
        assert_eq!(profile.email(), Some("jane@example.com"));
        assert_eq!(profile.json(), &jane_doe());
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(profile.raw()).unwrap(),
            jane_doe()
        );

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!has_authorization_header(&requests[0]));
        assert_eq!(access_tokens(&requests[0]), vec!["valid_token".to_string()]);
        assert!(requests[0].body.is_empty());
    }

    #[tokio::test]
    async fn test_user_profile_is_not_cached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/oauth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jane_doe()))
            .expect(2)
            .mount(&server)
            .await;

        let strategy = strategy_for(&server);
        let first = strategy.user_profile("token").await.unwrap();
        let second = strategy.user_profile("token").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_malformed_profile_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/oauth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let strategy = strategy_for(&server);
        let result = strategy.user_profile("token").await;

        match result {
            Err(WordPressError::Parse { body, .. }) => assert_eq!(body, "<html>not json</html>"),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_surfaces_unchanged_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/oauth/me/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let strategy = strategy_for(&server);
        let result = strategy.user_profile("token").await;

        match result {
            Err(WordPressError::Transport(OAuth2Error::RequestFailed { status, body })) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("Expected transport error, got {:?}", other),
        }

        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connection_failure_surfaces_as_transport_error() {
        let closed_addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let options = WordPressOptions::builder()
            .wordpress_url(format!("http://{}", closed_addr))
            .client_id("123-456-789")
            .client_secret("shhh-its-a-secret")
            .callback_url("https://www.example.net/auth/wordpress/callback")
            .build();

        let strategy = WordPressStrategy::new(options, accept_all).unwrap();
        let result = strategy.user_profile("token").await;

        assert!(matches!(
            result,
            Err(WordPressError::Transport(OAuth2Error::HttpError(_)))
        ));
    }

    #[tokio::test]
    async fn test_profile_url_without_trailing_slash_is_not_followed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/oauth/me"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("Location", format!("{}/oauth/me/", server.uri())),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/oauth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jane_doe()))
            .expect(0)
            .mount(&server)
            .await;

        let mut options = options_for(&server);
        options.profile_url = Some(format!("{}/oauth/me", server.uri()));
        let strategy = WordPressStrategy::new(options, accept_all).unwrap();

        let result = strategy.user_profile("token").await;
        assert!(matches!(
            result,
            Err(WordPressError::Transport(OAuth2Error::RequestFailed {
                status: 301,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_get_never_sends_authorization_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let strategy = strategy_for(&server);
        let cases = [
            ("/oauth/me/", "plain"),
            ("/wp-json/wp/v2/users/me?context=edit", "with space & symbols=?"),
            ("/resource?access_token=stale", "ünïcode-token"),
        ];

        for (path_and_query, token) in cases {
            let url = format!("{}{}", server.uri(), path_and_query);
            strategy.get(&url, token).await.unwrap();
        }

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), cases.len());

        for (request, (_, token)) in requests.iter().zip(cases) {
            assert!(!has_authorization_header(request));
            assert_eq!(access_tokens(request), vec![token.to_string()]);
        }

        let with_context = &requests[1];
        assert!(
            with_context
                .url
                .query_pairs()
                .any(|(k, v)| k == "context" && v == "edit")
        );
    }

    #[tokio::test]
    async fn test_full_flow_through_identity_provider() {
        init_tracing();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token/"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth_code"))
            .and(body_string_contains("client_id=123-456-789"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "wp_access_token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "wp_refresh_token",
                "scope": "basic"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/oauth/me/"))
            .and(query_param("access_token", "wp_access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jane_doe()))
            .expect(1)
            .mount(&server)
            .await;

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_verify = seen.clone();
        let verify = move |tokens: TokenResponse, profile: WordPressProfile| {
            let seen = seen_in_verify.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                assert_eq!(tokens.access_token, "wp_access_token");
                assert_eq!(tokens.refresh_token.as_deref(), Some("wp_refresh_token"));
                IdentityResult::Ok(Some(VerifiedIdentity::from(profile)))
            }
        };

        let strategy = WordPressStrategy::new(options_for(&server), verify).unwrap();
        let provider: Box<dyn IdentityProvider> = Box::new(strategy);
        assert_eq!(provider.provider_id(), "wordpress");

        let start = provider
            .verify(serde_json::json!({
                "type": "StartFlow",
                "provider_id": "wordpress"
            }))
            .await;

        let state = match start {
            Err(IdentityError::ProviderError(json)) => {
                let OAuth2Response::AuthorizationUrl { url, state } =
                    serde_json::from_str(&json).unwrap();
                assert!(url.starts_with(&format!("{}/oauth/authorize/", server.uri())));
                state
            }
            other => panic!("Expected authorization URL, got {:?}", other),
        };

        let identity = provider
            .verify(serde_json::json!({
                "type": "Callback",
                "provider_id": "wordpress",
                "code": "auth_code",
                "state": state
            }))
            .await
            .unwrap();

        assert_eq!(identity.provider_id, "wordpress");
        assert_eq!(identity.subject, "42");
        assert_eq!(identity.email, Some("jane@example.com".to_string()));
        assert_eq!(identity.display_name, Some("Jane Doe".to_string()));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        // State is single use
        let replay = provider
            .verify(serde_json::json!({
                "type": "Callback",
                "provider_id": "wordpress",
                "code": "auth_code",
                "state": state
            }))
            .await;
        assert!(matches!(replay, Err(IdentityError::ProviderError(_))));
    }

    #[tokio::test]
    async fn test_verifier_rejection_and_profile_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "wp_access_token",
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/oauth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jane_doe()))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/oauth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let reject = |_tokens: TokenResponse, _profile: WordPressProfile| async {
            IdentityResult::Ok(None::<VerifiedIdentity>)
        };
        let strategy = WordPressStrategy::new(options_for(&server), reject).unwrap();

        for expect_rejection in [true, false] {
            let state = match strategy
                .verify(serde_json::json!({"type": "StartFlow", "provider_id": "wordpress"}))
                .await
            {
                Err(IdentityError::ProviderError(json)) => {
                    let OAuth2Response::AuthorizationUrl { state, .. } =
                        serde_json::from_str(&json).unwrap();
                    state
                }
                other => panic!("Expected authorization URL, got {:?}", other),
            };

            let result = strategy
                .verify(serde_json::json!({
                    "type": "Callback",
                    "provider_id": "wordpress",
                    "code": "auth_code",
                    "state": state
                }))
                .await;

            if expect_rejection {
                assert!(matches!(result, Err(IdentityError::InvalidCredentials)));
            } else {
                assert!(
                    matches!(result, Err(IdentityError::ProviderError(msg)) if msg.contains("parse"))
                );
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_token_uses_token_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token/"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=wp_refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh_access_token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "next_refresh_token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let strategy = strategy_for(&server);
        let tokens = strategy.refresh_token("wp_refresh_token").await.unwrap();
        assert_eq!(tokens.access_token, "fresh_access_token");
        assert_eq!(tokens.refresh_token.as_deref(), Some("next_refresh_token"));
    }

    #[tokio::test]
    async fn test_concurrent_profile_fetches() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/oauth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jane_doe()))
            .expect(8)
            .mount(&server)
            .await;

        let strategy = Arc::new(strategy_for(&server));
        let mut handles = vec![];
        for i in 0..8 {
            let strategy = strategy.clone();
            handles.push(tokio::spawn(async move {
                strategy.user_profile(&format!("token-{}", i)).await
            }));
        }

        for handle in handles {
            let profile = handle.await.unwrap().unwrap();
            assert_eq!(profile.display_name(), "Jane Doe");
        }
    }
}
