// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use spotify_token_broker::{
	_preludet::*,
	auth::TokenSecret,
	config::Config,
	error::UpstreamError,
	flows::Broker,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::{
		TransportErrorMapper,
		oauth2::{
			AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
			http::{HeaderValue, StatusCode, header},
		},
	},
	provider::GrantType,
};

#[derive(Debug)]
enum FakeTransportError {
	Reset,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Reset => write!(f, "Connection reset by fake transport."),
		}
	}
}
impl StdError for FakeTransportError {}

/// What the fake transport answers with.
#[derive(Clone, Copy)]
enum Script {
	/// Stores a status, then fails at the transport level.
	FailAfterStatus(u16),
	/// Answers with a JSON body and the given status.
	Respond(u16, &'static str),
}

/// Parts of an outbound request the assertions look at.
#[derive(Clone, Debug)]
struct RecordedRequest {
	method: String,
	uri: String,
	authorization: Option<String>,
	body: String,
}
impl From<&HttpRequest> for RecordedRequest {
	fn from(request: &HttpRequest) -> Self {
		Self {
			method: request.method().to_string(),
			uri: request.uri().to_string(),
			authorization: request
				.headers()
				.get(header::AUTHORIZATION)
				.and_then(|value| value.to_str().ok())
				.map(ToOwned::to_owned),
			body: String::from_utf8_lossy(request.body()).into_owned(),
		}
	}
}

#[derive(Clone)]
struct FakeHttpClient {
	script: Script,
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
}
impl FakeHttpClient {
	fn new(script: Script) -> Self {
		Self { script, requests: Default::default() }
	}

	fn recorded_requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().clone()
	}
}
impl TokenHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { slot, script: self.script, requests: self.requests.clone() }
	}
}

struct FakeHttpHandle {
	slot: ResponseMetadataSlot,
	script: Script,
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let script = self.script;

		self.requests.lock().push(RecordedRequest::from(&request));

		Box::pin(async move {
			assert!(
				slot.take().is_none(),
				"ResponseMetadataSlot must be clear before dispatching a request."
			);

			match script {
				Script::FailAfterStatus(status) => {
					slot.store(ResponseMetadata { status: Some(status) });

					Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Reset)))
				},
				Script::Respond(status, body) => {
					let mut response = HttpResponse::new(body.as_bytes().to_vec());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Scripted status should be valid.");
					response
						.headers_mut()
						.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
					slot.store(ResponseMetadata { status: Some(status) });

					Ok(response)
				},
			}
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	metadata: Arc<Mutex<Vec<(GrantType, Option<ResponseMetadata>)>>>,
}
impl RecordingTransportErrorMapper {
	fn recorded(&self) -> Vec<(GrantType, Option<ResponseMetadata>)> {
		self.metadata.lock().clone()
	}
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> UpstreamError {
		self.metadata.lock().push((grant, meta.cloned()));

		match err {
			HttpClientError::Reqwest(inner) => UpstreamError::network(*inner),
			other => UpstreamError::Unexpected {
				message: format!("Unhandled fake transport error: {other:?}"),
				status: meta.and_then(|value| value.status),
			},
		}
	}
}

type FakeBroker = Broker<FakeHttpClient, RecordingTransportErrorMapper>;

fn build_fake_broker(script: Script) -> (FakeBroker, FakeHttpClient, RecordingTransportErrorMapper) {
	build_fake_broker_for(&test_config("https://accounts.example.com/api/token"), script)
}

fn build_fake_broker_for(
	config: &Config,
	script: Script,
) -> (FakeBroker, FakeHttpClient, RecordingTransportErrorMapper) {
	let http_client = FakeHttpClient::new(script);
	let mapper = RecordingTransportErrorMapper::default();
	let broker = FakeBroker::with_http_client(config, http_client.clone(), mapper.clone())
		.expect("Broker with fake transport should build.");

	(broker, http_client, mapper)
}

#[tokio::test]
async fn transport_failures_reach_the_mapper_with_metadata() {
	let (broker, _, mapper) = build_fake_broker(Script::FailAfterStatus(502));
	let err = broker.client_token().await.expect_err("Fake transport failure should surface.");

	assert!(matches!(err, Error::Upstream(UpstreamError::Network { .. })));
	assert_eq!(
		mapper.recorded(),
		vec![(GrantType::ClientCredentials, Some(ResponseMetadata { status: Some(502) }))]
	);
}

#[tokio::test]
async fn requests_carry_basic_auth_and_form_body() {
	let (broker, http_client, _) = build_fake_broker(Script::Respond(
		200,
		"{\"access_token\":\"AT\",\"token_type\":\"Bearer\",\"expires_in\":60}",
	));
	let response = broker.client_token().await.expect("Scripted response should succeed.");
	let requests = http_client.recorded_requests();
	let request = requests.first().expect("One request should be recorded.");

	assert_eq!(response.access_token.expose(), "AT");
	assert_eq!(requests.len(), 1);
	assert_eq!(request.method, "POST");
	assert_eq!(request.uri, "https://accounts.example.com/api/token");
	assert_eq!(request.authorization, Some(test_basic_auth_header()));
	assert_eq!(request.body, "grant_type=client_credentials");
}

#[tokio::test]
async fn basic_auth_form_encodes_reserved_characters() {
	let mut config = test_config("https://accounts.example.com/api/token");

	config.client_secret = TokenSecret::new("s+c:r t");

	let (broker, http_client, _) = build_fake_broker_for(
		&config,
		Script::Respond(200, "{\"access_token\":\"AT\",\"token_type\":\"Bearer\"}"),
	);

	broker.client_token().await.expect("Scripted response should succeed.");

	let requests = http_client.recorded_requests();
	let request = requests.first().expect("One request should be recorded.");

	// RFC 6749 section 2.3.1: credentials are form-URL-encoded before base64.
	assert_eq!(
		request.authorization,
		Some(format!("Basic {}", STANDARD.encode(format!("{TEST_CLIENT_ID}:s%2Bc%3Ar+t"))))
	);
}

#[tokio::test]
async fn error_bodies_keep_the_reported_status() {
	let (broker, _, mapper) = build_fake_broker(Script::Respond(
		401,
		"{\"error\":\"invalid_client\",\"error_description\":\"Invalid client secret\"}",
	));
	let err = broker.client_token().await.expect_err("Rejected request should fail.");

	match err {
		Error::Upstream(UpstreamError::Rejected { status, reason }) => {
			assert_eq!(status, Some(401));
			assert_eq!(reason, "invalid_client (Invalid client secret)");
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	assert!(mapper.recorded().is_empty(), "HTTP responses must not reach the transport mapper.");
}

#[tokio::test]
async fn malformed_success_bodies_are_parse_errors() {
	let (broker, _, _) = build_fake_broker(Script::Respond(200, "{\"token_type\":\"Bearer\"}"));
	let err = broker.client_token().await.expect_err("Body without access token should fail.");

	assert!(matches!(err, Error::Upstream(UpstreamError::Parse { status: Some(200), .. })));
}
