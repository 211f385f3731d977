//! Bearer-authenticated JSON client for tenant admin consoles: password login, persisted
//! sessions, and transparent one-shot token refresh-and-retry.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by unit and integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::TokenPair,
		client::ConsoleClient,
		config::ConsoleConfig,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		store::{MemoryStore, SessionStore},
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = ConsoleClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a configuration rooted at `base` (for example `MockServer::url("/api/v1/")`).
	pub fn test_config(base: &str) -> ConsoleConfig {
		test_config_builder(base).build().expect("Test configuration should build.")
	}

	/// Returns a builder rooted at `base` so tests can tweak options before building.
	pub fn test_config_builder(base: &str) -> crate::config::ConsoleConfigBuilder {
		ConsoleConfig::builder(Url::parse(base).expect("Test base URL should parse."))
	}

	/// Constructs a [`ConsoleClient`] backed by an in-memory store and the reqwest transport.
	pub fn build_reqwest_test_client(config: ConsoleConfig) -> (ReqwestTestClient, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn SessionStore> = store_backend.clone();
		let client = ConsoleClient::with_http_client(
			store,
			config,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		);

		(client, store_backend)
	}

	/// Seeds the client with an established session holding `access` and optionally `refresh`.
	pub async fn seed_session(client: &ReqwestTestClient, access: &str, refresh: Option<&str>) {
		client
			.establish(TokenPair::new(access, refresh.map(str::to_owned)))
			.await
			.expect("Failed to seed the session into the test client.");
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use oauth2::{HttpRequest, HttpResponse};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
