//! Response wrapper returned by [`ConsoleClient::send`](crate::client::ConsoleClient::send).

// crates.io
use oauth2::http::{HeaderMap, StatusCode};
// self
use crate::{_prelude::*, http};

/// FastAPI error body: `{"detail": "..."}` or a list of validation errors.
#[derive(Deserialize)]
struct ErrorBody {
	detail: serde_json::Value,
}

/// Status, headers, and body of an API response, returned unchanged for every status.
#[derive(Debug)]
pub struct ApiResponse(HttpResponse);
impl ApiResponse {
	pub(crate) fn new(inner: HttpResponse) -> Self {
		Self(inner)
	}

	/// Returns the HTTP status.
	pub fn status(&self) -> StatusCode {
		self.0.status()
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status().is_success()
	}

	/// Returns `true` for 401 responses.
	pub fn is_unauthorized(&self) -> bool {
		self.status() == StatusCode::UNAUTHORIZED
	}

	/// Returns the response headers.
	pub fn headers(&self) -> &HeaderMap {
		self.0.headers()
	}

	/// Returns the raw body.
	pub fn body(&self) -> &[u8] {
		self.0.body()
	}

	/// Returns the body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(self.body()).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: serde::de::DeserializeOwned,
	{
		serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(self.body()))
			.map_err(|source| Error::Decode { source, status: Some(self.status().as_u16()) })
	}

	/// Extracts the FastAPI `detail` message from an error body.
	pub fn error_detail(&self) -> Option<String> {
		error_detail(self.body())
	}

	/// Returns the `Retry-After` hint, if present.
	pub fn retry_after(&self) -> Option<Duration> {
		http::parse_retry_after(self.headers())
	}

	/// Consumes the wrapper and returns the underlying response.
	pub fn into_inner(self) -> HttpResponse {
		self.0
	}
}

/// Extracts `detail` from a FastAPI error body; non-string details are rendered as JSON.
pub(crate) fn error_detail(body: &[u8]) -> Option<String> {
	let parsed = serde_json::from_slice::<ErrorBody>(body).ok()?;

	match parsed.detail {
		serde_json::Value::String(message) => Some(message),
		serde_json::Value::Null => None,
		other => Some(other.to_string()),
	}
}
