//! Endpoint configuration and client options.
//!
//! A [`ConsoleConfig`] is assembled from the API base URL (for example
//! `http://localhost:8000/api/v1/`) through [`ConsoleConfigBuilder`]. The builder derives the
//! login, refresh, and current-user endpoints from the base unless they are overridden, and
//! validates every URL before the client uses it.

// std
use std::time::Duration as StdDuration;
// self
use crate::_prelude::*;

const LOGIN_PATH: &str = "auth/token";
const REFRESH_PATH: &str = "auth/refresh";
const CURRENT_USER_PATH: &str = "auth/me";
const DEFAULT_CLIENT_ID: &str = "admin-console";

/// Errors raised while constructing or validating a configuration.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ConsoleConfigError {
	/// Base URL cannot have relative paths joined onto it.
	#[error("The base URL cannot be used as a base: {url}.")]
	CannotBeBase {
		/// Offending URL.
		url: String,
	},
	/// Endpoints must use HTTP or HTTPS.
	#[error("The {endpoint} endpoint must use http or https: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Default endpoint could not be derived from the base URL.
	#[error("The {endpoint} endpoint could not be derived from the base URL.")]
	InvalidEndpoint {
		/// Which endpoint failed to resolve.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Password grants need a non-empty client identifier.
	#[error("Client identifier must not be empty.")]
	EmptyClientId,
}

/// Endpoint set used by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoints {
	/// Base URL relative request targets resolve against; always ends with `/`.
	pub base: Url,
	/// Password-grant login endpoint.
	pub login: Url,
	/// Refresh endpoint exchanging a refresh token for a new access token.
	pub refresh: Url,
	/// Current-user endpoint.
	pub current_user: Url,
}

/// Immutable client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
	/// Endpoint definitions.
	pub endpoints: ApiEndpoints,
	/// OAuth client identifier sent with password grants.
	pub client_id: String,
	/// Per-request timeout applied by the default transport.
	pub request_timeout: Option<StdDuration>,
	/// Coalesces concurrent refreshes behind one in-flight call when true.
	pub single_flight_refresh: bool,
}
impl ConsoleConfig {
	/// Creates a new builder for the provided API base URL.
	pub fn builder(base: Url) -> ConsoleConfigBuilder {
		ConsoleConfigBuilder::new(base)
	}

	/// Resolves a request target against the base URL.
	///
	/// Absolute URLs are used as-is. Relative targets are joined onto the base with any leading
	/// `/` stripped, so `/tenants/` and `tenants/` both land under the base path.
	pub fn resolve(&self, target: &str) -> Result<Url, url::ParseError> {
		match Url::parse(target) {
			Ok(url) => Ok(url),
			Err(url::ParseError::RelativeUrlWithoutBase) =>
				self.endpoints.base.join(target.trim_start_matches('/')),
			Err(e) => Err(e),
		}
	}
}

/// Builder for [`ConsoleConfig`] values.
#[derive(Debug)]
pub struct ConsoleConfigBuilder {
	/// API base URL.
	pub base: Url,
	/// Optional login endpoint override.
	pub login_endpoint: Option<Url>,
	/// Optional refresh endpoint override.
	pub refresh_endpoint: Option<Url>,
	/// Optional current-user endpoint override.
	pub current_user_endpoint: Option<Url>,
	/// OAuth client identifier.
	pub client_id: String,
	/// Per-request timeout.
	pub request_timeout: Option<StdDuration>,
	/// Refresh coordination mode.
	pub single_flight_refresh: bool,
}
impl ConsoleConfigBuilder {
	/// Creates a new builder seeded with the provided base URL.
	pub fn new(base: Url) -> Self {
		Self {
			base,
			login_endpoint: None,
			refresh_endpoint: None,
			current_user_endpoint: None,
			client_id: DEFAULT_CLIENT_ID.into(),
			request_timeout: None,
			single_flight_refresh: true,
		}
	}

	/// Overrides the login endpoint.
	pub fn login_endpoint(mut self, url: Url) -> Self {
		self.login_endpoint = Some(url);

		self
	}

	/// Overrides the refresh endpoint.
	pub fn refresh_endpoint(mut self, url: Url) -> Self {
		self.refresh_endpoint = Some(url);

		self
	}

	/// Overrides the current-user endpoint.
	pub fn current_user_endpoint(mut self, url: Url) -> Self {
		self.current_user_endpoint = Some(url);

		self
	}

	/// Sets the OAuth client identifier sent with password grants.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = client_id.into();

		self
	}

	/// Sets the per-request timeout applied by the default transport.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Toggles single-flight refresh coordination (enabled by default).
	///
	/// With coordination disabled every request that receives a 401 performs its own refresh,
	/// so concurrent failures race on which access token ends up stored.
	pub fn single_flight_refresh(mut self, enabled: bool) -> Self {
		self.single_flight_refresh = enabled;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ConsoleConfig, ConsoleConfigError> {
		let mut base = self.base;

		validate_endpoint("base", &base)?;

		if base.cannot_be_a_base() {
			return Err(ConsoleConfigError::CannotBeBase { url: base.to_string() });
		}
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		let login = derive_endpoint("login", &base, self.login_endpoint, LOGIN_PATH)?;
		let refresh = derive_endpoint("refresh", &base, self.refresh_endpoint, REFRESH_PATH)?;
		let current_user = derive_endpoint(
			"current_user",
			&base,
			self.current_user_endpoint,
			CURRENT_USER_PATH,
		)?;

		if self.client_id.trim().is_empty() {
			return Err(ConsoleConfigError::EmptyClientId);
		}

		Ok(ConsoleConfig {
			endpoints: ApiEndpoints { base, login, refresh, current_user },
			client_id: self.client_id,
			request_timeout: self.request_timeout,
			single_flight_refresh: self.single_flight_refresh,
		})
	}
}

fn derive_endpoint(
	name: &'static str,
	base: &Url,
	explicit: Option<Url>,
	default_path: &str,
) -> Result<Url, ConsoleConfigError> {
	let url = match explicit {
		Some(url) => url,
		None => base
			.join(default_path)
			.map_err(|source| ConsoleConfigError::InvalidEndpoint { endpoint: name, source })?,
	};

	validate_endpoint(name, &url)?;

	Ok(url)
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConsoleConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ConsoleConfigError::UnsupportedScheme { endpoint: name, url: url.to_string() }),
	}
}
