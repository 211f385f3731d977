//! Password-grant facade over the `oauth2` crate and transport error mapping.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, HttpClientError, RequestTokenError, ResourceOwnerPassword,
	ResourceOwnerUsername, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	client::response::error_detail,
	config::ConsoleConfig,
	error::{ConfigError, TransientError, TransportError},
	http::{ApiHttpClient, ResponseMetadata, ResponseMetadataSlot},
	obs::FlowKind,
};

/// Maps HTTP transport failures into client [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a client error.
	fn map_transport_error(
		&self,
		kind: FlowKind,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		kind: FlowKind,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(kind, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(kind, meta, message),
			_ => map_unknown_transport_error(kind, meta),
		}
	}
}

/// Runs the resource-owner password grant against the configured login endpoint.
pub(crate) async fn exchange_password<C, M>(
	config: &ConsoleConfig,
	http_client: &C,
	mapper: &M,
	username: &str,
	password: &str,
) -> Result<TokenPair>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let oauth_client = BasicClient::new(ClientId::new(config.client_id.clone()))
		.set_token_uri(TokenUrl::from_url(config.endpoints.login.clone()))
		.set_auth_type(AuthType::RequestBody);
	let meta = ResponseMetadataSlot::default();
	let instrumented = http_client.with_metadata(meta.clone());
	let username = ResourceOwnerUsername::new(username.to_owned());
	let password = ResourceOwnerPassword::new(password.to_owned());
	let response = oauth_client
		.exchange_password(&username, &password)
		.request_async(&instrumented)
		.await
		.map_err(|err| map_request_error(meta.take(), err, mapper))?;

	Ok(TokenPair::new(
		response.access_token().secret().to_owned(),
		response.refresh_token().map(|token| token.secret().to_owned()),
	))
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, meta_ref),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(FlowKind::Login, meta_ref, error),
		RequestTokenError::Parse(error, body) => match meta_status(meta_ref) {
			Some(status) if status >= 400 => map_rejection(
				meta_ref,
				error_detail(&body).unwrap_or_else(|| format!("HTTP {status}")),
			),
			status => Error::Decode { source: error, status },
		},
		RequestTokenError::Other(message) => map_rejection(meta_ref, message),
	}
}

fn map_server_response_error(
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let reason = match response.error_description() {
		Some(description) => description.clone(),
		None => response.error().as_ref().to_string(),
	};

	map_rejection(meta, reason)
}

// Client errors mean the credentials were refused; anything else is an upstream problem.
fn map_rejection(meta: Option<&ResponseMetadata>, reason: String) -> Error {
	match meta_status(meta) {
		Some(status) if (400..500).contains(&status) => Error::InvalidCredentials { reason },
		status => TransientError::Endpoint {
			message: format!("Login endpoint returned an unexpected response: {reason}."),
			status,
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(kind: FlowKind, meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Endpoint {
			message: format!("Request timed out during the {kind} flow."),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(
	kind: FlowKind,
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> Error {
	TransientError::Endpoint {
		message: format!("HTTP client error occurred during the {kind} flow: {message}."),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

#[cfg(feature = "reqwest")]
fn map_unknown_transport_error(kind: FlowKind, meta: Option<&ResponseMetadata>) -> Error {
	TransientError::Endpoint {
		message: format!("HTTP client error occurred during the {kind} flow."),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
