// crates.io
use axum::{
	Router,
	body::Body,
	http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use httpmock::prelude::*;
use serde_json::{Value, json};
use tower::ServiceExt;
// self
use spotify_token_broker::{_preludet::*, crypto};

const TOKEN_BODY: &str = "{\"access_token\":\"AT\",\"token_type\":\"Bearer\",\"expires_in\":3600,\"refresh_token\":\"RT\"}";

async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
	let response = router.oneshot(request).await.expect("Router should produce a response.");
	let status = response.status();
	let headers = response.headers().clone();
	let bytes = response
		.into_body()
		.collect()
		.await
		.expect("Response body should be readable.")
		.to_bytes();
	let body = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Response body should be JSON.")
	};

	(status, headers, body)
}

fn json_post(path: &str, body: Value) -> Request<Body> {
	Request::post(path)
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from(body.to_string()))
		.expect("JSON request should build.")
}

fn form_post(path: &str, body: &'static str) -> Request<Body> {
	Request::post(path)
		.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
		.body(Body::from(body))
		.expect("Form request should build.")
}

fn empty_post(path: &str) -> Request<Body> {
	Request::post(path).body(Body::empty()).expect("Empty request should build.")
}

#[tokio::test]
async fn client_token_route_returns_token() {
	let server = MockServer::start_async().await;
	let router = build_test_router(&test_config(&server.url("/api/token")));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/token")
				.form_urlencoded_tuple("grant_type", "client_credentials");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let (status, _, body) = send(router, empty_post("/clientToken")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "access_token": "AT", "expires_in": 3600 }));

	mock.assert_async().await;
}

#[tokio::test]
async fn exchange_code_accepts_json_and_form_bodies() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.url("/api/token"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/token")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", "abc")
				.form_urlencoded_tuple("redirect_uri", TEST_CALLBACK_URL);
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let requests = [
		json_post("/exchangeCode", json!({ "code": "abc" })),
		form_post("/exchangeCode", "code=abc"),
	];

	for request in requests {
		let (status, _, body) = send(build_test_router(&config), request).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["success"], json!(true));
		assert_eq!(body["access_token"], json!("AT"));
		assert_eq!(body["expires_in"], json!(3600));
		assert_eq!(body["token_type"], json!("Bearer"));

		let sealed = body["refresh_token"].as_str().expect("Refresh token should be a string.");

		assert_ne!(sealed, "RT");
		assert_eq!(
			crypto::decrypt(sealed, TEST_ENCRYPTION_SECRET).expect("Envelope should open."),
			"RT"
		);
	}

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn exchange_code_protocol_uses_native_callback() {
	let server = MockServer::start_async().await;
	let router = build_test_router(&test_config(&server.url("/api/token")));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/token")
				.form_urlencoded_tuple("redirect_uri", TEST_CALLBACK_PROTOCOL_URL);
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let (status, _, body) =
		send(router, json_post("/exchangeCodeProtocol", json!({ "code": "abc" }))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["success"], json!(true));

	mock.assert_async().await;
}

#[tokio::test]
async fn missing_parameters_are_bad_requests() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.url("/api/token"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let cases = [
		(empty_post("/exchangeCode"), "Missing 'code' parameter"),
		(json_post("/exchangeCodeProtocol", json!({ "code": "" })), "Missing 'code' parameter"),
		(form_post("/refreshToken", ""), "Missing 'refresh_token' parameter"),
		(json_post("/refreshToken", json!({})), "Missing 'refresh_token' parameter"),
	];

	for (request, msg) in cases {
		let (status, _, body) = send(build_test_router(&config), request).await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, json!({ "success": false, "msg": msg }));
	}

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn malformed_input_is_rejected() {
	let config = test_config("http://127.0.0.1:1/api/token");
	let invalid_json = Request::post("/exchangeCode")
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from("{\"code\":"))
		.expect("Request should build.");
	let (status, _, body) = send(build_test_router(&config), invalid_json).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "success": false, "msg": "Invalid request body" }));

	let bad_callback = json_post("/exchangeCode", json!({ "code": "abc", "callbackUrl": "::" }));
	let (status, _, body) = send(build_test_router(&config), bad_callback).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "success": false, "msg": "Invalid 'callbackUrl' parameter" }));

	let bad_envelope = json_post("/refreshToken", json!({ "refresh_token": "RT" }));
	let (status, _, body) = send(build_test_router(&config), bad_envelope).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "success": false, "msg": "Invalid 'refresh_token' parameter" }));
}

#[tokio::test]
async fn refresh_route_returns_access_token_only() {
	let server = MockServer::start_async().await;
	let router = build_test_router(&test_config(&server.url("/api/token")));
	let envelope = crypto::encrypt("RT", TEST_ENCRYPTION_SECRET).expect("Sealing should succeed.");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/token")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "RT");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let (status, _, body) =
		send(router, json_post("/refreshToken", json!({ "refresh_token": envelope }))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "access_token": "AT", "expires_in": 3600, "success": true }));

	mock.assert_async().await;
}

#[tokio::test]
async fn upstream_failures_are_server_errors() {
	let server = MockServer::start_async().await;
	let router = build_test_router(&test_config(&server.url("/api/token")));
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(500);
		})
		.await;
	let (status, _, body) = send(router, empty_post("/clientToken")).await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(
		body,
		json!({ "success": false, "msg": "Received invalid status code '500' from Spotify." })
	);

	let unreachable = build_test_router(&test_config("http://127.0.0.1:1/api/token"));
	let (status, _, body) = send(unreachable, empty_post("/clientToken")).await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body, json!({ "success": false, "msg": "Failed to reach Spotify." }));
}

#[tokio::test]
async fn preflight_mirrors_origin_by_default() {
	let router = build_test_router(&test_config("http://127.0.0.1:1/api/token"));
	let request = Request::builder()
		.method("OPTIONS")
		.uri("/exchangeCode")
		.header(header::ORIGIN, "https://anywhere.example")
		.header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
		.header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
		.body(Body::empty())
		.expect("Preflight request should build.");
	let (status, headers, _) = send(router, request).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(
		headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|value| value.to_str().ok()),
		Some("https://anywhere.example")
	);
	assert_eq!(
		headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).and_then(|value| value.to_str().ok()),
		Some("content-type")
	);
}

#[tokio::test]
async fn allowlist_refuses_foreign_origins() {
	let server = MockServer::start_async().await;
	let mut config = test_config(&server.url("/api/token"));

	config.cors.allowed_origins = vec!["https://app.example.com".into()];

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let foreign = Request::post("/clientToken")
		.header(header::ORIGIN, "https://evil.example.com")
		.body(Body::empty())
		.expect("Request should build.");
	let (status, headers, body) = send(build_test_router(&config), foreign).await;

	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body, json!({ "success": false, "msg": "Origin not allowed" }));
	assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

	mock.assert_calls_async(0).await;

	let allowed = Request::post("/clientToken")
		.header(header::ORIGIN, "https://app.example.com")
		.body(Body::empty())
		.expect("Request should build.");
	let (status, headers, _) = send(build_test_router(&config), allowed).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(
		headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|value| value.to_str().ok()),
		Some("https://app.example.com")
	);

	mock.assert_calls_async(1).await;
}
