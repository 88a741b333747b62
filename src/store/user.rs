//! The user record and the payload types used to create and update it.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::{Uuid, Variant, Version};

/// Length of the hyphenated textual form of a UUID.
const HYPHENATED_LEN: usize = 36;

/// A stored user.
///
/// The `id` is generated server-side on creation and never changes afterwards.
/// `age` keeps the JSON number exactly as the client sent it, so `54` stays an
/// integer and `54.5` stays a float when echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub age: Number,
    pub hobbies: Vec<String>,
}

/// A fully validated creation payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub age: Number,
    pub hobbies: Vec<String>,
}

impl NewUser {
    /// Attaches an identifier, producing the record that gets stored.
    pub fn into_user(self, id: Uuid) -> User {
        User {
            id,
            username: self.username,
            age: self.age,
            hobbies: self.hobbies,
        }
    }
}

/// A validated update payload. Absent fields leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub age: Option<Number>,
    pub hobbies: Option<Vec<String>>,
}

impl UserPatch {
    /// Returns true if applying this patch would not touch any field.
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.age.is_none() && self.hobbies.is_none()
    }
}

impl User {
    /// Overwrites every field present in `patch`. The id is never touched.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(hobbies) = patch.hobbies {
            self.hobbies = hobbies;
        }
    }
}

/// Parses a user id from a path segment.
///
/// Only the hyphenated form of an RFC 4122 version-4 UUID is accepted; braced,
/// URN and simple forms as well as other versions are rejected.
pub fn parse_user_id(raw: &str) -> Option<Uuid> {
    if raw.len() != HYPHENATED_LEN {
        return None;
    }

    let id = Uuid::try_parse(raw).ok()?;
    if id.get_version() == Some(Version::Random) && id.get_variant() == Variant::RFC4122 {
        Some(id)
    } else {
        None
    }
}
