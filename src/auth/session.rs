//! In-memory session state shared by every request a client issues.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, UserProfile},
};

/// Access/refresh pair issued by the login endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
	/// Short-lived bearer credential.
	pub access_token: TokenSecret,
	/// Longer-lived credential exchanged for new access tokens.
	pub refresh_token: Option<TokenSecret>,
}
impl TokenPair {
	/// Creates a pair from raw token strings.
	pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: refresh_token.map(TokenSecret::new),
		}
	}
}

/// Client-side representation of an authenticated user's credentials and identity.
///
/// A session holds at most one access token and one refresh token. Clients replace both
/// through [`Session::establish`] and [`Session::rotate`] so superseded secrets never linger.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
	/// Bearer credential attached to outgoing requests.
	pub access_token: Option<TokenSecret>,
	/// Credential used to mint a new access token after a 401.
	pub refresh_token: Option<TokenSecret>,
	/// Profile loaded from the current-user endpoint.
	pub current_user: Option<UserProfile>,
}
impl Session {
	/// Creates a session from a freshly issued pair.
	pub fn from_pair(pair: TokenPair) -> Self {
		Self {
			access_token: Some(pair.access_token),
			refresh_token: pair.refresh_token,
			current_user: None,
		}
	}

	/// Returns `true` when an access token is present.
	pub fn is_authenticated(&self) -> bool {
		self.access_token.is_some()
	}

	/// Returns `true` when the session can attempt a refresh.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.is_some()
	}

	/// Replaces both tokens and forgets the previously loaded profile.
	pub fn establish(&mut self, pair: TokenPair) {
		*self = Self::from_pair(pair);
	}

	/// Installs a refreshed access token, rotating the refresh token when one was issued.
	pub fn rotate(&mut self, access_token: TokenSecret, refresh_token: Option<TokenSecret>) {
		self.access_token = Some(access_token);

		if let Some(refresh) = refresh_token {
			self.refresh_token = Some(refresh);
		}
	}

	/// Drops every credential and the cached profile.
	pub fn clear(&mut self) {
		*self = Self::default();
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rotate_keeps_refresh_token_unless_replaced() {
		let mut session = Session::from_pair(TokenPair::new("A1", Some("R1".into())));

		session.rotate(TokenSecret::new("A2"), None);

		assert_eq!(session.access_token, Some(TokenSecret::new("A2")));
		assert_eq!(session.refresh_token, Some(TokenSecret::new("R1")));

		session.rotate(TokenSecret::new("A3"), Some(TokenSecret::new("R2")));

		assert_eq!(session.access_token, Some(TokenSecret::new("A3")));
		assert_eq!(session.refresh_token, Some(TokenSecret::new("R2")));
	}

	#[test]
	fn establish_and_clear_reset_profile() {
		let mut session = Session {
			current_user: Some(UserProfile::default()),
			..Session::from_pair(TokenPair::new("A1", None))
		};

		session.establish(TokenPair::new("B1", Some("S1".into())));

		assert!(session.is_authenticated());
		assert!(session.can_refresh());
		assert!(session.current_user.is_none());

		session.clear();

		assert_eq!(session, Session::default());
		assert!(!session.is_authenticated());
	}
}
