//! Authenticated console client and its session flows.

pub mod lifecycle;
pub mod refresh;
pub mod request;
pub mod response;
pub mod send;

pub use refresh::*;
pub use request::*;
pub use response::*;

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenSecret, UserProfile},
	config::ConsoleConfig,
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
	store::SessionStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestConsoleClient = ConsoleClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Issues API calls on behalf of one console session.
///
/// The client owns the session (tokens plus the current user), the store the session is
/// mirrored into, and the transport used for every call. Clones share all of it, so one
/// refresh is visible to every clone immediately.
#[derive(Clone)]
pub struct ConsoleClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Store the session tokens are persisted into.
	pub store: Arc<dyn SessionStore>,
	/// Endpoints and client options.
	pub config: ConsoleConfig,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	session: Arc<RwLock<Session>>,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl<C, M> ConsoleClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	///
	/// The session starts empty; call [`ConsoleClient::restore`] or [`ConsoleClient::login`].
	pub fn with_http_client(
		store: Arc<dyn SessionStore>,
		config: ConsoleConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			config,
			refresh_metrics: Default::default(),
			session: Default::default(),
			refresh_guard: Default::default(),
		}
	}

	/// Returns a snapshot of the current session.
	pub fn session(&self) -> Session {
		self.session.read().clone()
	}

	/// Returns `true` when an access token is held.
	pub fn is_authenticated(&self) -> bool {
		self.session.read().is_authenticated()
	}

	/// Returns the profile loaded by the last successful current-user lookup.
	pub fn current_user(&self) -> Option<UserProfile> {
		self.session.read().current_user.clone()
	}

	fn access_token(&self) -> Option<TokenSecret> {
		self.session.read().access_token.clone()
	}

	fn refresh_token(&self) -> Option<TokenSecret> {
		self.session.read().refresh_token.clone()
	}

	fn has_refresh_token(&self) -> bool {
		self.session.read().can_refresh()
	}
}
#[cfg(feature = "reqwest")]
impl ConsoleClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new client for the provided configuration.
	///
	/// The client provisions its own reqwest-backed transport honoring
	/// [`ConsoleConfig::request_timeout`].
	pub fn new(store: Arc<dyn SessionStore>, config: ConsoleConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::from_config(&config)?;

		Ok(Self::with_http_client(store, config, http_client, ReqwestTransportErrorMapper))
	}
}
impl<C, M> Debug for ConsoleClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let session = self.session.read();

		f.debug_struct("ConsoleClient")
			.field("base", &self.config.endpoints.base.as_str())
			.field("authenticated", &session.is_authenticated())
			.field("can_refresh", &session.can_refresh())
			.finish()
	}
}
