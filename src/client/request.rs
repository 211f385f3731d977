//! Request builder consumed by [`ConsoleClient::send`](crate::client::ConsoleClient::send).

// crates.io
use oauth2::http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Method, target, headers, and optional body of an API call.
///
/// The target is either a path relative to the configured base URL (`/admin/tenants/`) or an
/// absolute URL. The bearer header is managed by the client and never needs to be set here.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Base-relative path or absolute URL.
	pub target: String,
	/// Caller-supplied headers.
	pub headers: HeaderMap,
	/// Raw request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, target: impl Into<String>) -> Self {
		Self { method, target: target.into(), headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(target: impl Into<String>) -> Self {
		Self::new(Method::GET, target)
	}

	/// Shorthand for a `POST` request.
	pub fn post(target: impl Into<String>) -> Self {
		Self::new(Method::POST, target)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(target: impl Into<String>) -> Self {
		Self::new(Method::PUT, target)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(target: impl Into<String>) -> Self {
		Self::new(Method::DELETE, target)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `value` as the JSON body.
	pub fn json<T>(self, value: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(value).map_err(ConfigError::RequestBody)?;

		Ok(self.body(body))
	}

	/// Builds the wire request for `url`, attaching the bearer header when a token is given.
	///
	/// `Content-Type: application/json` is added unless the caller already set one. Without a
	/// token no `Authorization` header is added.
	pub(crate) fn to_http(&self, url: &Url, token: Option<&TokenSecret>) -> Result<HttpRequest> {
		let mut headers = self.headers.clone();

		if !headers.contains_key(CONTENT_TYPE) {
			headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
		}
		if let Some(token) = token {
			let mut value = HeaderValue::from_str(&token.bearer()).map_err(ConfigError::from)?;

			value.set_sensitive(true);
			headers.insert(AUTHORIZATION, value);
		}

		let mut request = oauth2::http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())
			.map_err(ConfigError::from)?;

		*request.headers_mut() = headers;

		Ok(request)
	}
}
