//! Client-level error types shared across sessions, transports, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// Ordinary HTTP error statuses returned by [`ConsoleClient::send`](crate::client::ConsoleClient::send)
/// are never reported through this type; callers inspect the returned response instead.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Refresh failed and the session has been torn down; the caller must sign in again.
	#[error("Session expired; sign in again.")]
	SessionExpired(#[source] RefreshError),
	/// The operation requires credentials the session does not hold.
	#[error("No authenticated session is available.")]
	NotAuthenticated,
	/// Login endpoint rejected the supplied credentials.
	#[error("Login was rejected: {reason}.")]
	InvalidCredentials {
		/// Server-supplied reason string.
		reason: String,
	},
	/// Endpoint answered with a status the operation cannot interpret.
	#[error("Endpoint responded with HTTP {status}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
		/// Server-supplied `detail`, when present.
		detail: Option<String>,
	},
	/// Response body could not be decoded.
	#[error("Response body is malformed.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl Error {
	/// Returns `true` when the error means the caller must show a login surface.
	pub fn is_session_expired(&self) -> bool {
		matches!(self, Self::SessionExpired(_) | Self::NotAuthenticated)
	}
}

/// Reasons a refresh call failed; every variant results in session teardown.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the refresh token with HTTP {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Server-supplied `detail`, when present.
		detail: Option<String>,
	},
	/// Refresh call never produced a response.
	#[error("Refresh endpoint could not be reached.")]
	Unreachable(#[source] Box<Error>),
	/// Refresh response body could not be parsed.
	#[error("Refresh endpoint returned malformed JSON.")]
	Malformed {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Refresh response carried an empty access token.
	#[error("Refresh endpoint returned an empty access token.")]
	MissingAccessToken,
}

/// Configuration and request construction failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Header value contains bytes HTTP does not allow.
	#[error(transparent)]
	InvalidHeader(#[from] oauth2::http::header::InvalidHeaderValue),
	/// Request target cannot be resolved against the base URL.
	#[error("Request target `{target}` is not a valid URL.")]
	InvalidTarget {
		/// Target as supplied by the caller.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized to JSON.")]
	RequestBody(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Endpoint returned an unexpected but non-fatal response or timed out.
	#[error("{message}")]
	Endpoint {
		/// Message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn session_expired_is_flagged_for_login_surfaces() {
		let expired = Error::SessionExpired(RefreshError::MissingAccessToken);

		assert!(expired.is_session_expired());
		assert!(Error::NotAuthenticated.is_session_expired());
		assert!(!Error::InvalidCredentials { reason: "nope".into() }.is_session_expired());

		let source = StdError::source(&expired)
			.expect("Session expiry should expose the refresh failure as its source.");

		assert_eq!(source.to_string(), "Refresh endpoint returned an empty access token.");
	}

	#[test]
	fn unreachable_refresh_keeps_transport_cause() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
		let err = RefreshError::Unreachable(Box::new(TransportError::Io(io).into()));
		let source = StdError::source(&err).expect("Unreachable refresh should expose its cause.");

		assert_eq!(source.to_string(), "I/O error occurred while calling the API.");
	}
}
