//! Session lifecycle: login, restore, current-user lookup, and logout.

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenPair, UserProfile},
	client::{ApiRequest, ConsoleClient},
	http::ApiHttpClient,
	oauth::{self, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, flow_debug, flow_warn},
	store::{self, StoreError},
};

impl<C, M> ConsoleClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Logs in with the password grant and loads the current user.
	///
	/// Tokens are persisted before the session adopts them. A login endpoint answering with a
	/// 4xx status yields [`Error::InvalidCredentials`] carrying the server's reason.
	///
	/// Login is all-or-nothing: when the current-user lookup fails, the freshly issued tokens
	/// are torn down again before the lookup error is returned.
	pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let pair = oauth::exchange_password(
					&self.config,
					self.http_client.as_ref(),
					self.transport_mapper.as_ref(),
					username,
					password,
				)
				.await?;

				self.establish(pair).await?;

				match self.load_current_user().await {
					Ok(profile) => Ok(profile),
					Err(e) => {
						if let Err(_store_err) = self.teardown().await {
							flow_warn!(error = %_store_err, "failed to discard tokens after login");
						}

						Err(e)
					},
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Adopts a token pair obtained outside [`ConsoleClient::login`].
	///
	/// The pair is persisted first; the previous current user is dropped.
	pub async fn establish(&self, pair: TokenPair) -> Result<()> {
		store::save_tokens(self.store.as_ref(), &pair).await?;
		self.session.write().establish(pair);

		Ok(())
	}

	/// Fetches the current user through [`ConsoleClient::send`] and caches it on the session.
	///
	/// Non-2xx responses yield [`Error::UnexpectedStatus`].
	pub async fn load_current_user(&self) -> Result<UserProfile> {
		let request = ApiRequest::get(self.config.endpoints.current_user.as_str());
		let response = self.send(request).await?;

		if !response.is_success() {
			return Err(Error::UnexpectedStatus {
				status: response.status().as_u16(),
				detail: response.error_detail(),
			});
		}

		let profile = response.json::<UserProfile>()?;

		self.session.write().current_user = Some(profile.clone());

		Ok(profile)
	}

	/// Rebuilds the session from persisted tokens.
	///
	/// Returns `true` when an access token was found. The current user is not fetched; call
	/// [`ConsoleClient::load_current_user`] to validate the restored tokens.
	pub async fn restore(&self) -> Result<bool> {
		const KIND: FlowKind = FlowKind::Restore;

		let span = FlowSpan::new(KIND, "restore");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (access_token, refresh_token) = store::load_tokens(self.store.as_ref()).await?;
				let restored = access_token.is_some();

				*self.session.write() = Session { access_token, refresh_token, current_user: None };
				flow_debug!(restored, "session restored from storage");

				Ok(restored)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Clears the session in memory and in storage.
	pub async fn logout(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(async move { Ok(self.teardown().await?) }).await;

		obs::record_result(KIND, &result);

		result
	}

	/// Drops the in-memory session, then removes both persisted tokens.
	pub(crate) async fn teardown(&self) -> Result<(), StoreError> {
		self.session.write().clear();

		store::clear_tokens(self.store.as_ref()).await
	}
}
