use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::UserError;

// ============================================================================
// User Aggregate
// ============================================================================
//
// JSON visibility is declared per field instead of being inferred:
//
//   field     read   write
//   id        no     no     (exposed as a link)
//   username  yes    yes
//   password  no     yes
//   status    yes    no
//
// Unknown properties are ignored on input.
//
// ============================================================================

// Serialized through `UserView`: the password never leaves the service but
// stays in the schema as write-only.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(into = "UserView")]
pub struct User {
    #[serde(skip)]
    id: Option<Uuid>,
    #[serde(skip)]
    version: i64,

    username: String,
    #[schema(write_only)]
    password: String,
    #[schema(read_only)]
    status: Option<String>,
}

/// Read-side shape of a user.
#[derive(Serialize)]
struct UserView {
    username: String,
    status: Option<String>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            status: user.status,
        }
    }
}

/// Write-side shape of a user: only the fields a client may set.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

/// Partial update accepted for an existing user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub password: Option<String>,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, UserError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(UserError::EmptyUsername);
        }

        Ok(Self {
            id: None,
            version: 0,
            username,
            password: password.into(),
            status: None,
        })
    }

    pub(crate) fn restore(
        id: Uuid,
        version: i64,
        username: String,
        password: String,
        status: Option<String>,
    ) -> Self {
        Self {
            id: Some(id),
            version,
            username,
            password,
            status,
        }
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    pub fn apply_changes(&mut self, changes: UserChanges) {
        if let Some(password) = changes.password {
            self.set_password(password);
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub(crate) fn assign_identity(&mut self, id: Uuid, version: i64) {
        self.id = Some(id);
        self.version = version;
    }

    pub(crate) fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

impl TryFrom<NewUser> for User {
    type Error = UserError;

    fn try_from(value: NewUser) -> Result<Self, Self::Error> {
        User::new(value.username, value.password)
    }
}
