//! Opaque user profile returned by the current-user endpoint.

// self
use crate::_prelude::*;

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Roles the backend assigns to console users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
	/// Operator with access to every tenant.
	SuperAdmin,
	/// Administrator scoped to a single tenant.
	TenantAdmin,
	/// Regular console user.
	User,
	/// Machine user that authenticates with API tokens.
	ApiUser,
}
impl UserRole {
	/// Returns the wire label used by the backend.
	pub const fn as_str(self) -> &'static str {
		match self {
			UserRole::SuperAdmin => "SUPER_ADMIN",
			UserRole::TenantAdmin => "TENANT_ADMIN",
			UserRole::User => "USER",
			UserRole::ApiUser => "API_USER",
		}
	}
}
impl Display for UserRole {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for UserRole {
	type Err = UnknownRole;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"SUPER_ADMIN" => Ok(UserRole::SuperAdmin),
			"TENANT_ADMIN" => Ok(UserRole::TenantAdmin),
			"USER" => Ok(UserRole::User),
			"API_USER" => Ok(UserRole::ApiUser),
			_ => Err(UnknownRole(s.to_owned())),
		}
	}
}

/// Error returned when a role label is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown user role `{0}`.")]
pub struct UnknownRole(pub String);

/// User object returned by `GET /auth/me`.
///
/// The backend owns the schema, so the profile keeps the raw JSON object and only offers typed
/// accessors for the handful of fields consoles branch on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(JsonMap);
impl UserProfile {
	/// Wraps an already-decoded JSON object.
	pub fn new(fields: JsonMap) -> Self {
		Self(fields)
	}

	/// Returns a raw field.
	pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
		self.0.get(field)
	}

	/// Returns the numeric user identifier.
	pub fn id(&self) -> Option<i64> {
		self.get("id").and_then(serde_json::Value::as_i64)
	}

	/// Returns the login email.
	pub fn email(&self) -> Option<&str> {
		self.get("email").and_then(serde_json::Value::as_str)
	}

	/// Returns the display name.
	pub fn full_name(&self) -> Option<&str> {
		self.get("full_name").and_then(serde_json::Value::as_str)
	}

	/// Returns the owning tenant identifier, if the user belongs to one.
	pub fn tenant_id(&self) -> Option<i64> {
		self.get("tenant_id").and_then(serde_json::Value::as_i64)
	}

	/// Returns whether the account is active; absent means active.
	pub fn is_active(&self) -> bool {
		self.get("is_active").and_then(serde_json::Value::as_bool).unwrap_or(true)
	}

	/// Returns the parsed role, ignoring labels this crate does not know.
	pub fn role(&self) -> Option<UserRole> {
		self.get("role").and_then(serde_json::Value::as_str).and_then(|raw| raw.parse().ok())
	}

	/// Returns `true` for super administrators.
	pub fn is_super_admin(&self) -> bool {
		self.role() == Some(UserRole::SuperAdmin)
	}

	/// Borrows the underlying JSON object.
	pub fn as_map(&self) -> &JsonMap {
		&self.0
	}

	/// Consumes the profile and returns the underlying JSON object.
	pub fn into_map(self) -> JsonMap {
		self.0
	}
}
