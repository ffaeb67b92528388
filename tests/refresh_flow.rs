//! Authenticated request pipeline against a mocked API: refresh de-duplication, teardown and the
//! request scenarios.

mod common;

use std::time::Duration;

use common::{
    CLIENT_SECRET, Profile, TestClient, mint_jwt, profile_body, refresh_body, test_config,
};
use futures::future::join_all;
use iter_bene::{
    api::types::Envelope,
    client::ApiRequest,
    config::Config,
    error::{AppError, FailureKind},
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

const CONCURRENT_REQUESTS: usize = 8;

async fn fetch_profile(test: &TestClient) -> Result<Profile, AppError> {
    test.client
        .request::<Envelope<Profile>>(ApiRequest::get("/users/me"))
        .await
        .map(Envelope::into_attributes)
}

#[tokio::test]
async fn test_valid_token_needs_no_refresh() {
    let server = MockServer::start().await;
    let access = mint_jwt("u1", 3600);

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("nomad")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let test = TestClient::for_server(&server, "/feed");
    test.sign_in(&access, &mint_jwt("u1", 86_400));

    let profile = fetch_profile(&test).await.unwrap();
    assert_eq!(profile.username, "nomad");
    assert_eq!(test.client.coordinator().episodes_started(), 0);
}

#[tokio::test]
async fn test_expired_access_refreshes_once_and_retries_once() {
    let server = MockServer::start().await;
    let expired = mint_jwt("u1", -60);
    let refresh = mint_jwt("u1", 86_400);
    let fresh = mint_jwt("u1", 3600);

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {expired}").as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .and(body_json(json!({ "refreshToken": refresh })))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body(&fresh, None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {fresh}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("nomad")))
        .expect(1)
        .mount(&server)
        .await;

    let test = TestClient::for_server(&server, "/feed");
    test.sign_in(&expired, &refresh);

    let profile = fetch_profile(&test).await.unwrap();
    assert_eq!(profile.username, "nomad");
    assert_eq!(test.client.store().access_token().as_deref(), Some(fresh.as_str()));
    assert_eq!(test.client.store().refresh_token().as_deref(), Some(refresh.as_str()));
}

#[tokio::test]
async fn test_missing_credentials_redirect_without_network() {
    let server = MockServer::start().await;
    let mut test = TestClient::for_server(&server, "/groups/7?tab=events");

    let error = fetch_profile(&test).await.unwrap_err();

    assert!(error.is_unauthorized());
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(
        test.drain_navigations(),
        vec!["/auth?redirect=%2Fgroups%2F7%3Ftab%3Devents".to_string()]
    );
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;
    let expired = mint_jwt("u1", -60);
    let refresh = mint_jwt("u1", 86_400);
    let fresh = mint_jwt("u1", 3600);

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {expired}").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(CONCURRENT_REQUESTS as u64)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(refresh_body(&fresh, None))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {fresh}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("nomad")))
        .expect(CONCURRENT_REQUESTS as u64)
        .mount(&server)
        .await;

    let test = TestClient::for_server(&server, "/feed");
    test.sign_in(&expired, &refresh);

    let results = join_all((0..CONCURRENT_REQUESTS).map(|_| fetch_profile(&test))).await;

    assert!(results.iter().all(|result| result.is_ok()));
    assert_eq!(test.client.coordinator().episodes_started(), 1);
    assert!(!test.client.coordinator().is_refreshing());
}

#[tokio::test]
async fn test_failed_refresh_tears_down_exactly_once() {
    let server = MockServer::start().await;
    let expired = mint_jwt("u1", -60);

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "refresh token revoked" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut test = TestClient::for_server(&server, "/messages/42");
    test.sign_in(&expired, &mint_jwt("u1", 86_400));
    test.client
        .cache()
        .storage
        .set_item("draft-message", "see you in Porto")
        .await;

    let results = join_all((0..CONCURRENT_REQUESTS).map(|_| fetch_profile(&test))).await;

    for result in results {
        let error = result.unwrap_err();
        assert_eq!(error.kind(), Some(FailureKind::Unauthorized));
    }
    assert_eq!(
        test.drain_navigations(),
        vec!["/auth?redirect=%2Fmessages%2F42".to_string()]
    );
    assert!(test.client.teardown().is_torn_down());
    assert!(test.jar.is_empty());
    assert_eq!(test.client.cache().storage.get_item("draft-message").await, None);
}

#[tokio::test]
async fn test_refresh_timeout_is_a_failed_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(refresh_body("never-used", None))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.api.refresh_timeout = Duration::from_millis(200);
    let mut test = TestClient::new(&config, "/feed");
    test.sign_in(&mint_jwt("u1", -60), &mint_jwt("u1", 86_400));

    let error = fetch_profile(&test).await.unwrap_err();

    assert!(error.is_unauthorized());
    assert_eq!(test.drain_navigations().len(), 1);
    assert_eq!(test.client.store().refresh_token(), None);
}

#[tokio::test]
async fn test_malformed_refresh_response_is_a_failed_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let test = TestClient::for_server(&server, "/feed");
    test.sign_in(&mint_jwt("u1", -60), &mint_jwt("u1", 86_400));

    assert!(fetch_profile(&test).await.unwrap_err().is_unauthorized());
    assert!(test.client.teardown().is_torn_down());
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let server = MockServer::start().await;
    let expired = mint_jwt("u1", -60);
    let fresh = mint_jwt("u1", 3600);
    let rotated = mint_jwt("u1", 172_800);

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {expired}").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(refresh_body(&fresh, Some(&rotated))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {fresh}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("nomad")))
        .mount(&server)
        .await;

    let test = TestClient::for_server(&server, "/feed");
    test.sign_in(&expired, &mint_jwt("u1", 86_400));

    fetch_profile(&test).await.unwrap();
    assert_eq!(test.client.store().refresh_token().as_deref(), Some(rotated.as_str()));
}

#[tokio::test]
async fn test_refresh_before_request_when_only_refresh_token_present() {
    let server = MockServer::start().await;
    let refresh = mint_jwt("u1", 86_400);
    let fresh = mint_jwt("u1", 3600);

    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body(&fresh, None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {fresh}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("nomad")))
        .expect(1)
        .mount(&server)
        .await;

    let test = TestClient::for_server(&server, "/feed");
    test.client.store().store_refresh_token(&refresh);

    assert_eq!(fetch_profile(&test).await.unwrap().username, "nomad");
}

#[tokio::test]
async fn test_rejected_refreshed_token_is_final_and_trips_breaker() {
    let server = MockServer::start().await;
    let fresh = mint_jwt("u1", 3600);

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body(&fresh, None)))
        .expect(3)
        .mount(&server)
        .await;

    let mut test = TestClient::for_server(&server, "/feed");
    test.sign_in(&mint_jwt("u1", -60), &mint_jwt("u1", 86_400));

    for _ in 0..2 {
        let error = fetch_profile(&test).await.unwrap_err();
        assert!(error.is_unauthorized());
        assert!(!test.client.teardown().is_torn_down());
    }

    let error = fetch_profile(&test).await.unwrap_err();
    assert!(error.is_unauthorized());
    assert!(test.client.teardown().is_torn_down());
    assert_eq!(test.drain_navigations().len(), 1);
}

#[tokio::test]
async fn test_non_auth_failures_are_surfaced_without_refresh() {
    let server = MockServer::start().await;
    let access = mint_jwt("u1", 3600);

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "User not found" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts/feed"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let test = TestClient::for_server(&server, "/feed");
    test.sign_in(&access, &mint_jwt("u1", 86_400));

    let error = fetch_profile(&test).await.unwrap_err();
    assert_eq!(error.kind(), Some(FailureKind::Client));
    assert_eq!(error.user_safe_message(), "User not found");

    let error = test
        .client
        .request::<serde_json::Value>(ApiRequest::get("/posts/feed"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), Some(FailureKind::Server));

    assert_eq!(test.client.coordinator().episodes_started(), 0);
    assert!(!test.client.teardown().is_torn_down());
}

#[tokio::test]
async fn test_cached_get_reads_through_and_teardown_clears() {
    let server = MockServer::start().await;
    let access = mint_jwt("u1", 3600);

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("nomad")))
        .expect(1)
        .mount(&server)
        .await;

    let test = TestClient::for_server(&server, "/feed");
    test.sign_in(&access, &mint_jwt("u1", 86_400));

    for _ in 0..2 {
        let profile = test
            .client
            .cached_get::<Envelope<Profile>>(ApiRequest::get("/users/me"))
            .await
            .unwrap();
        assert_eq!(profile.into_attributes().username, "nomad");
    }
    assert_eq!(test.client.cache().queries.entry_count().await, 1);

    test.client.end_session("logout").await;
    assert_eq!(test.client.cache().queries.entry_count().await, 0);
}

#[tokio::test]
async fn test_logout_during_refresh_discards_issued_tokens() {
    let server = MockServer::start().await;
    let fresh = mint_jwt("u1", 3600);

    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(refresh_body(&fresh, Some(&mint_jwt("u1", 172_800))))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("nomad")))
        .expect(0)
        .mount(&server)
        .await;

    let mut test = TestClient::for_server(&server, "/feed");
    test.client.store().store_refresh_token(&mint_jwt("u1", 86_400));

    let client = test.client.clone();
    let pending = tokio::spawn(async move {
        client
            .request::<Envelope<Profile>>(ApiRequest::get("/users/me"))
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(test.client.coordinator().is_refreshing());
    assert!(test.client.end_session("logout").await);

    let error = pending.await.unwrap().unwrap_err();
    assert!(error.is_unauthorized());
    assert_eq!(test.client.store().access_token(), None);
    assert_eq!(test.client.store().refresh_token(), None);
    assert!(test.jar.is_empty());
    assert!(test.client.teardown().is_torn_down());
    assert_eq!(test.drain_navigations().len(), 1);
}

#[tokio::test]
async fn test_response_arriving_after_logout_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(profile_body("nomad"))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let test = TestClient::for_server(&server, "/feed");
    test.sign_in(&mint_jwt("u1", 3600), &mint_jwt("u1", 86_400));

    let client = test.client.clone();
    let pending = tokio::spawn(async move {
        client
            .cached_get::<Envelope<Profile>>(ApiRequest::get("/users/me"))
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    test.client.end_session("logout").await;

    assert!(pending.await.unwrap().is_ok());
    assert_eq!(test.client.cache().queries.entry_count().await, 0);
}

#[tokio::test]
async fn test_unreachable_refresh_host_is_a_failed_refresh() {
    let unreachable = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = Config::with_defaults(&format!("http://{unreachable}"), CLIENT_SECRET);

    let mut test = TestClient::new(&config, "/trips/9");
    test.client.store().store_refresh_token(&mint_jwt("u1", 86_400));

    let results = join_all((0..CONCURRENT_REQUESTS).map(|_| fetch_profile(&test))).await;

    for result in results {
        assert!(result.unwrap_err().is_unauthorized());
    }
    assert_eq!(test.client.coordinator().episodes_started(), 1);
    assert_eq!(
        test.drain_navigations(),
        vec!["/auth?redirect=%2Ftrips%2F9".to_string()]
    );
    assert!(test.client.teardown().is_torn_down());
    assert_eq!(test.client.store().refresh_token(), None);
}
