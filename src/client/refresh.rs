//! Refresh-token exchange, 401 recovery, and session teardown on refresh failure.
//!
//! A rejected access token is renewed at most once per request. With single-flight
//! coordination enabled (the default) concurrent requests that observe a 401 queue behind one
//! [`AsyncMutex`]; whoever acquires it after a successful refresh reuses the rotated token
//! instead of spending the refresh token again.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{ApiRequest, ConsoleClient},
	error::RefreshError,
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, flow_debug, flow_warn},
	store,
};

#[derive(Serialize)]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
}

impl<C, M> ConsoleClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges the held refresh token for a new access token.
	///
	/// Returns [`Error::NotAuthenticated`] when no refresh token is held. Any refresh failure
	/// tears the session down (memory and storage) and surfaces as [`Error::SessionExpired`].
	pub async fn refresh_session(&self) -> Result<TokenSecret> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_session");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _singleflight = if self.config.single_flight_refresh {
					Some(self.refresh_guard.lock().await)
				} else {
					None
				};
				let refresh = self.refresh_token().ok_or(Error::NotAuthenticated)?;

				self.refresh_with(refresh).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Renews the session after `rejected` came back with a 401.
	///
	/// Returns the token the request should be retried with, or `None` when the session holds
	/// nothing to refresh with anymore.
	pub(crate) async fn renew_after_unauthorized(
		&self,
		rejected: Option<&TokenSecret>,
	) -> Result<Option<TokenSecret>> {
		if !self.config.single_flight_refresh {
			return match self.refresh_token() {
				Some(refresh) => self.refresh_with(refresh).await.map(Some),
				None => Ok(None),
			};
		}

		let _singleflight = self.refresh_guard.lock().await;

		// Another request refreshed while this one waited on the guard.
		if let Some(current) = self.access_token().filter(|current| Some(current) != rejected) {
			self.refresh_metrics.record_coalesced();
			flow_debug!("reusing access token rotated by a concurrent refresh");

			return Ok(Some(current));
		}

		match self.refresh_token() {
			Some(refresh) => self.refresh_with(refresh).await.map(Some),
			None => Ok(None),
		}
	}

	async fn refresh_with(&self, refresh: TokenSecret) -> Result<TokenSecret> {
		self.refresh_metrics.record_attempt();

		let grant = match self.exchange_refresh_token(&refresh).await {
			Ok(grant) => grant,
			Err(cause) => {
				self.refresh_metrics.record_failure();
				flow_warn!(error = %cause, "token refresh failed; tearing down the session");
				self.teardown().await?;

				return Err(Error::SessionExpired(cause));
			},
		};
		let access_token = TokenSecret::new(grant.access_token);
		let rotated = grant.refresh_token.filter(|value| !value.is_empty()).map(TokenSecret::new);

		// Storage first so a failed write leaves memory and disk in agreement.
		if let Err(e) =
			store::save_rotation(self.store.as_ref(), &access_token, rotated.as_ref()).await
		{
			self.refresh_metrics.record_failure();
			flow_warn!(error = %e, "failed to persist refreshed tokens");

			return Err(e.into());
		}

		self.session.write().rotate(access_token.clone(), rotated);
		self.refresh_metrics.record_success();
		flow_debug!("access token refreshed");

		Ok(access_token)
	}

	async fn exchange_refresh_token(
		&self,
		refresh: &TokenSecret,
	) -> Result<RefreshResponse, RefreshError> {
		let endpoint = &self.config.endpoints.refresh;
		let request = ApiRequest::post(endpoint.as_str())
			.json(&RefreshRequest { refresh_token: refresh.expose() })
			.map_err(unreachable_error)?;
		// The refresh call never carries the rejected bearer token.
		let http_request = request.to_http(endpoint, None).map_err(unreachable_error)?;
		let response =
			self.dispatch(FlowKind::Refresh, http_request).await.map_err(unreachable_error)?;

		if !response.is_success() {
			return Err(RefreshError::Rejected {
				status: response.status().as_u16(),
				detail: response.error_detail(),
			});
		}

		let mut deserializer = serde_json::Deserializer::from_slice(response.body());
		let grant: RefreshResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| RefreshError::Malformed { source })?;

		if grant.access_token.is_empty() {
			return Err(RefreshError::MissingAccessToken);
		}

		Ok(grant)
	}
}

fn unreachable_error(e: Error) -> RefreshError {
	RefreshError::Unreachable(Box::new(e))
}
