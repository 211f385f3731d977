//! Persistence contract and built-in stores for session tokens.
//!
//! Consoles mirror the in-memory session into a small key-value store so a restarted
//! process can resume without another login. Tokens live under the fixed keys
//! [`ACCESS_TOKEN_KEY`] and [`REFRESH_TOKEN_KEY`].

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
};

/// Storage key holding the current access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key holding the current refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key-value backend the client mirrors session tokens into.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if any.
	fn load<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Writes `value` under `key`, replacing any previous value.
	fn save<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Deletes `key`; removing a missing key succeeds.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Persists a token pair; a pair without a refresh token removes the stale one.
///
/// When the second write fails the previous access token is put back, so the store never
/// pairs the new access token with an outdated refresh token.
pub async fn save_tokens(store: &dyn SessionStore, pair: &TokenPair) -> Result<(), StoreError> {
	let previous = store.load(ACCESS_TOKEN_KEY).await?;

	store.save(ACCESS_TOKEN_KEY, pair.access_token.expose().to_owned()).await?;

	let written = match &pair.refresh_token {
		Some(refresh) => store.save(REFRESH_TOKEN_KEY, refresh.expose().to_owned()).await,
		None => store.remove(REFRESH_TOKEN_KEY).await,
	};

	rollback_on_error(store, ACCESS_TOKEN_KEY, previous, written).await
}

/// Persists a refreshed access token and, when rotated, the new refresh token.
///
/// Both keys keep their previous values when the rotated refresh token cannot be written.
pub async fn save_rotation(
	store: &dyn SessionStore,
	access_token: &TokenSecret,
	refresh_token: Option<&TokenSecret>,
) -> Result<(), StoreError> {
	let Some(refresh) = refresh_token else {
		return store.save(ACCESS_TOKEN_KEY, access_token.expose().to_owned()).await;
	};
	let previous = store.load(ACCESS_TOKEN_KEY).await?;

	store.save(ACCESS_TOKEN_KEY, access_token.expose().to_owned()).await?;

	let written = store.save(REFRESH_TOKEN_KEY, refresh.expose().to_owned()).await;

	rollback_on_error(store, ACCESS_TOKEN_KEY, previous, written).await
}

// Restores `key` to `previous` when `written` failed; the original error wins.
async fn rollback_on_error(
	store: &dyn SessionStore,
	key: &str,
	previous: Option<String>,
	written: Result<(), StoreError>,
) -> Result<(), StoreError> {
	let Err(e) = written else {
		return Ok(());
	};
	let _ = match previous {
		Some(value) => store.save(key, value).await,
		None => store.remove(key).await,
	};

	Err(e)
}

/// Reads both persisted tokens.
pub async fn load_tokens(
	store: &dyn SessionStore,
) -> Result<(Option<TokenSecret>, Option<TokenSecret>), StoreError> {
	let access = store.load(ACCESS_TOKEN_KEY).await?.filter(|v| !v.is_empty());
	let refresh = store.load(REFRESH_TOKEN_KEY).await?.filter(|v| !v.is_empty());

	Ok((access.map(TokenSecret::new), refresh.map(TokenSecret::new)))
}

/// Removes both persisted tokens.
///
/// Both removals are attempted even when the first fails; the first error is returned.
pub async fn clear_tokens(store: &dyn SessionStore) -> Result<(), StoreError> {
	let access = store.remove(ACCESS_TOKEN_KEY).await;
	let refresh = store.remove(REFRESH_TOKEN_KEY).await;

	access.and(refresh)
}
