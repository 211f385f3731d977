#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use console_session::{
	_preludet::*,
	auth::{TokenPair, TokenSecret},
	client::{ApiRequest, ConsoleClient},
	error::RefreshError,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	store::{
		ACCESS_TOKEN_KEY, MemoryStore, REFRESH_TOKEN_KEY, SessionStore, StoreError, StoreFuture,
	},
};

const TENANTS: &str = "/api/v1/admin/tenants/";
const REFRESH: &str = "/api/v1/auth/refresh";
const TENANTS_BODY: &str = r#"[{"id":1,"name":"Acme","slug":"acme"}]"#;

fn build_client(server: &MockServer) -> (ReqwestTestClient, Arc<MemoryStore>) {
	build_reqwest_test_client(test_config(&server.url("/api/v1/")))
}

#[tokio::test]
async fn non_unauthorized_responses_pass_through_without_refresh() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);

	seed_session(&client, "A1", Some("R1")).await;

	let forbidden = server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS).header("authorization", "Bearer A1");
			then.status(403)
				.header("content-type", "application/json")
				.body(r#"{"detail":"Not enough permissions"}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).header("content-type", "application/json").body(r#"{"access_token":"A2"}"#);
		})
		.await;
	let response =
		client.send(ApiRequest::get(TENANTS)).await.expect("A 403 should come back as a response.");

	assert_eq!(response.status().as_u16(), 403);
	assert_eq!(response.error_detail().as_deref(), Some("Not enough permissions"));

	forbidden.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("A1"));
	assert_eq!(client.refresh_metrics.attempts(), 0);
}

#[tokio::test]
async fn unauthorized_request_is_refreshed_and_replayed_once() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);

	seed_session(&client, "A1", Some("R1")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS).header("authorization", "Bearer A1");
			then.status(401).header("content-type", "application/json").body(r#"{"detail":"expired"}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(REFRESH)
				.header("content-type", "application/json")
				.body(r#"{"refresh_token":"R1"}"#);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"A2","token_type":"bearer"}"#);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS).header("authorization", "Bearer A2");
			then.status(200).header("content-type", "application/json").body(TENANTS_BODY);
		})
		.await;
	let response = client
		.send(ApiRequest::get(TENANTS))
		.await
		.expect("Request should succeed after the refresh.");

	assert_eq!(response.status().as_u16(), 200);

	let tenants: Vec<serde_json::Value> =
		response.json().expect("Tenant list fixture should decode.");

	assert_eq!(tenants[0]["slug"], "acme");

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;

	let session = client.session();

	assert_eq!(session.access_token.as_ref().map(TokenSecret::expose), Some("A2"));
	assert_eq!(session.refresh_token.as_ref().map(TokenSecret::expose), Some("R1"));
	assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("A2"));
	assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
	assert_eq!(client.refresh_metrics.successes(), 1);
}

#[tokio::test]
async fn rotated_refresh_token_is_persisted() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);

	seed_session(&client, "A1", Some("R1")).await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH).body(r#"{"refresh_token":"R1"}"#);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"A2","refresh_token":"R2","token_type":"bearer"}"#);
		})
		.await;
	let access = client.refresh_session().await.expect("Explicit refresh should succeed.");

	assert_eq!(access.expose(), "A2");

	refresh.assert_async().await;

	assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("A2"));
	assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("R2"));
	assert_eq!(client.session().refresh_token.as_ref().map(TokenSecret::expose), Some("R2"));
}

#[tokio::test]
async fn rejected_refresh_tears_down_the_session() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);

	seed_session(&client, "A1", Some("R1")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS).header("authorization", "Bearer A1");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"detail":"Invalid refresh token"}"#);
		})
		.await;
	let err = client
		.send(ApiRequest::get(TENANTS))
		.await
		.expect_err("A rejected refresh should fail the request.");

	match &err {
		Error::SessionExpired(RefreshError::Rejected { status, detail }) => {
			assert_eq!(*status, 400);
			assert_eq!(detail.as_deref(), Some("Invalid refresh token"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(err.is_session_expired());

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	assert!(!client.is_authenticated());
	assert_eq!(client.session(), Default::default());
	assert!(store.is_empty());
	assert_eq!(client.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn unreachable_refresh_endpoint_tears_down_the_session() {
	let server = MockServer::start_async().await;
	let config = test_config_builder(&server.url("/api/v1/"))
		.refresh_endpoint(
			Url::parse("http://127.0.0.1:9/auth/refresh")
				.expect("Closed-port refresh endpoint should parse."),
		)
		.build()
		.expect("Configuration with a refresh override should build.");
	let (client, store) = build_reqwest_test_client(config);

	seed_session(&client, "A1", Some("R1")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS);
			then.status(401);
		})
		.await;
	let err = client
		.send(ApiRequest::get(TENANTS))
		.await
		.expect_err("An unreachable refresh endpoint should fail the request.");

	assert!(
		matches!(err, Error::SessionExpired(RefreshError::Unreachable(_))),
		"Unexpected error variant: {err:?}."
	);

	rejected.assert_calls_async(1).await;

	assert!(!client.is_authenticated());
	assert!(store.is_empty());
}

#[tokio::test]
async fn malformed_refresh_body_tears_down_the_session() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);

	seed_session(&client, "A1", Some("R1")).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS);
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).header("content-type", "application/json").body("not json");
		})
		.await;

	let err = client
		.send(ApiRequest::get(TENANTS))
		.await
		.expect_err("A malformed refresh body should fail the request.");

	assert!(
		matches!(err, Error::SessionExpired(RefreshError::Malformed { .. })),
		"Unexpected error variant: {err:?}."
	);
	assert!(store.is_empty());
}

#[tokio::test]
async fn empty_access_token_counts_as_refresh_failure() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);

	seed_session(&client, "A1", Some("R1")).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).header("content-type", "application/json").body(r#"{"access_token":""}"#);
		})
		.await;

	let err = client.refresh_session().await.expect_err("Empty access tokens should be refused.");

	assert!(matches!(err, Error::SessionExpired(RefreshError::MissingAccessToken)));
	assert!(store.is_empty());
	assert!(!client.is_authenticated());
}

#[tokio::test]
async fn second_unauthorized_is_returned_without_another_refresh() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_client(&server);

	seed_session(&client, "A1", Some("R1")).await;

	let first = server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS).header("authorization", "Bearer A1");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).header("content-type", "application/json").body(r#"{"access_token":"A2"}"#);
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS).header("authorization", "Bearer A2");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"detail":"Inactive user"}"#);
		})
		.await;
	let response = client
		.send(ApiRequest::get(TENANTS))
		.await
		.expect("The replayed 401 should be returned as a response.");

	assert_eq!(response.status().as_u16(), 401);
	assert_eq!(response.error_detail().as_deref(), Some("Inactive user"));

	first.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	second.assert_calls_async(1).await;

	assert_eq!(client.session().access_token.as_ref().map(TokenSecret::expose), Some("A2"));
}

#[tokio::test]
async fn unauthorized_without_refresh_token_is_returned_as_is() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);

	seed_session(&client, "A1", None).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS).header("authorization", "Bearer A1");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).header("content-type", "application/json").body(r#"{"access_token":"A2"}"#);
		})
		.await;
	let response = client
		.send(ApiRequest::get(TENANTS))
		.await
		.expect("A 401 without a refresh token should come back as a response.");

	assert_eq!(response.status().as_u16(), 401);

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(client.is_authenticated());
	assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("A1"));
}

#[tokio::test]
async fn refresh_session_without_refresh_token_is_not_authenticated() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_client(&server);
	let err = client.refresh_session().await.expect_err("Empty sessions cannot refresh.");

	assert!(matches!(err, Error::NotAuthenticated));
}

async fn concurrent_unauthorized(single_flight: bool) -> (usize, u64) {
	let server = MockServer::start_async().await;
	let config = test_config_builder(&server.url("/api/v1/"))
		.single_flight_refresh(single_flight)
		.build()
		.expect("Configuration should build.");
	let (client, _store) = build_reqwest_test_client(config);

	seed_session(&client, "A1", Some("R1")).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS).header("authorization", "Bearer A1");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS).header("authorization", "Bearer A2");
			then.status(200).header("content-type", "application/json").body(TENANTS_BODY);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).header("content-type", "application/json").body(r#"{"access_token":"A2"}"#);
		})
		.await;
	let (first, second) =
		tokio::join!(client.send(ApiRequest::get(TENANTS)), client.send(ApiRequest::get(TENANTS)));

	assert_eq!(first.expect("First request should succeed.").status().as_u16(), 200);
	assert_eq!(second.expect("Second request should succeed.").status().as_u16(), 200);

	(refresh.calls_async().await, client.refresh_metrics.coalesced())
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
	let (refresh_calls, coalesced) = concurrent_unauthorized(true).await;

	assert_eq!(refresh_calls, 1);
	assert_eq!(coalesced, 1);
}

#[tokio::test]
async fn independent_refresh_mode_refreshes_per_request() {
	let (refresh_calls, coalesced) = concurrent_unauthorized(false).await;

	assert_eq!(refresh_calls, 2);
	assert_eq!(coalesced, 0);
}

#[tokio::test]
async fn request_transport_failure_keeps_the_session() {
	let (client, store) = build_reqwest_test_client(test_config("http://127.0.0.1:9/api/v1/"));

	seed_session(&client, "A1", Some("R1")).await;

	let err = client
		.send(ApiRequest::get(TENANTS))
		.await
		.expect_err("A closed port should fail the request.");

	assert!(!err.is_session_expired(), "Unexpected error variant: {err:?}.");
	assert!(client.is_authenticated());
	assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
	assert_eq!(client.refresh_metrics.attempts(), 0);
}

/// Memory-backed store that refuses one specific write.
#[derive(Default)]
struct RefusingStore {
	inner: MemoryStore,
	refused_save: Option<(&'static str, &'static str)>,
	refused_remove: Option<&'static str>,
}
impl RefusingStore {
	fn refusing_save(key: &'static str, value: &'static str) -> Self {
		Self { refused_save: Some((key, value)), ..Default::default() }
	}

	fn refusing_remove(key: &'static str) -> Self {
		Self { refused_remove: Some(key), ..Default::default() }
	}
}
impl SessionStore for RefusingStore {
	fn load<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		self.inner.load(key)
	}

	fn save<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		if self.refused_save == Some((key, value.as_str())) {
			return Box::pin(async { Err(StoreError::Backend { message: "disk full".into() }) });
		}

		self.inner.save(key, value)
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		if self.refused_remove == Some(key) {
			return Box::pin(async { Err(StoreError::Backend { message: "io".into() }) });
		}

		self.inner.remove(key)
	}
}

async fn client_with_store(
	server: &MockServer,
	backend: RefusingStore,
) -> (ReqwestTestClient, Arc<RefusingStore>) {
	let backend = Arc::new(backend);
	let store: Arc<dyn SessionStore> = backend.clone();
	let client: ReqwestTestClient = ConsoleClient::with_http_client(
		store,
		test_config(&server.url("/api/v1/")),
		ReqwestHttpClient::default(),
		ReqwestTransportErrorMapper,
	);

	client
		.establish(TokenPair::new("A1", Some("R1".into())))
		.await
		.expect("Seeding the session should succeed.");

	(client, backend)
}

#[tokio::test]
async fn refresh_persist_failure_keeps_previous_tokens() {
	let server = MockServer::start_async().await;
	let (client, backend) =
		client_with_store(&server, RefusingStore::refusing_save(ACCESS_TOKEN_KEY, "A2")).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).header("content-type", "application/json").body(r#"{"access_token":"A2"}"#);
		})
		.await;

	let err = client.refresh_session().await.expect_err("Persisting A2 should fail.");

	assert!(matches!(err, Error::Storage(StoreError::Backend { .. })));
	assert_eq!(client.session().access_token.as_ref().map(TokenSecret::expose), Some("A1"));
	assert_eq!(backend.inner.get(ACCESS_TOKEN_KEY).as_deref(), Some("A1"));
	assert_eq!(client.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn rotated_refresh_token_persist_failure_rolls_back_access_token() {
	let server = MockServer::start_async().await;
	let (client, backend) =
		client_with_store(&server, RefusingStore::refusing_save(REFRESH_TOKEN_KEY, "R2")).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"A2","refresh_token":"R2"}"#);
		})
		.await;

	let err = client.refresh_session().await.expect_err("Persisting R2 should fail.");

	assert!(matches!(err, Error::Storage(StoreError::Backend { .. })));

	let session = client.session();

	assert_eq!(session.access_token.as_ref().map(TokenSecret::expose), Some("A1"));
	assert_eq!(session.refresh_token.as_ref().map(TokenSecret::expose), Some("R1"));
	assert_eq!(backend.inner.get(ACCESS_TOKEN_KEY).as_deref(), Some("A1"));
	assert_eq!(backend.inner.get(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
}

#[tokio::test]
async fn teardown_removes_refresh_token_when_access_removal_fails() {
	let server = MockServer::start_async().await;
	let (client, backend) =
		client_with_store(&server, RefusingStore::refusing_remove(ACCESS_TOKEN_KEY)).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(TENANTS);
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"detail":"Invalid refresh token"}"#);
		})
		.await;

	let err = client
		.send(ApiRequest::get(TENANTS))
		.await
		.expect_err("Teardown with a failing store should fail the request.");

	assert!(matches!(err, Error::Storage(StoreError::Backend { .. })), "Unexpected error: {err:?}.");
	assert!(!client.is_authenticated());
	assert_eq!(backend.inner.get(REFRESH_TOKEN_KEY), None);
}
