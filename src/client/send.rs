//! Authenticated request dispatch with one refresh-and-retry on 401.

// crates.io
use oauth2::AsyncHttpClient;
// self
use crate::{
	_prelude::*,
	client::{ApiRequest, ApiResponse, ConsoleClient},
	error::ConfigError,
	http::{ApiHttpClient, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<C, M> ConsoleClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Sends `request` with the session's bearer token attached.
	///
	/// Behavior:
	/// - Without an access token the request goes out with no `Authorization` header.
	/// - Any response other than 401 is returned unchanged, error statuses included.
	/// - A 401 while a refresh token is held triggers exactly one refresh, after which the
	///   request is replayed once with the new token and that response is returned as-is.
	/// - A 401 without a refresh token is returned unchanged.
	/// - A failed refresh tears the session down and yields [`Error::SessionExpired`].
	///
	/// Transport failures of the request itself propagate without touching the session.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let url = self.config.resolve(&request.target).map_err(|source| {
					ConfigError::InvalidTarget { target: request.target.clone(), source }
				})?;
				let token = self.access_token();
				let response = self.dispatch(KIND, request.to_http(&url, token.as_ref())?).await?;

				if !response.is_unauthorized() || !self.has_refresh_token() {
					return Ok(response);
				}

				let Some(renewed) = self.renew_after_unauthorized(token.as_ref()).await? else {
					return Ok(response);
				};

				self.dispatch(KIND, request.to_http(&url, Some(&renewed))?).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Executes one HTTP exchange and maps transport failures through the configured mapper.
	pub(crate) async fn dispatch(
		&self,
		kind: FlowKind,
		request: HttpRequest,
	) -> Result<ApiResponse> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());

		match handle.call(request).await {
			Ok(response) => Ok(ApiResponse::new(response)),
			Err(e) => Err(self.transport_mapper.map_transport_error(kind, meta.take().as_ref(), e)),
		}
	}
}
