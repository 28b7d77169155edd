use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::store::UserRecord;

time::serde::format_description!(public_date, Date, "[year]-[month]-[day]");

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session: Uuid,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "public_date::option")]
    pub dob: Option<Date>,
    pub has_avatar: bool,
}

impl From<UserRecord> for PublicUser {
    fn from(u: UserRecord) -> Self {
        Self {
            has_avatar: u.avatar.is_some(),
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            dob: u.dob,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn public_user_hides_password() {
        let mut rec = UserRecord::new("bob", "secret-digest");
        rec.dob = Some(date!(2001 - 02 - 03));
        let json = serde_json::to_string(&PublicUser::from(rec)).unwrap();
        assert!(json.contains("\"username\":\"bob\""));
        assert!(json.contains("\"dob\":\"2001-02-03\""));
        assert!(json.contains("\"has_avatar\":false"));
        assert!(!json.contains("secret-digest"));
    }
}
