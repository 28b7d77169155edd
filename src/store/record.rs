use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month};

time::serde::format_description!(dob_format, Date, "[year]-[month]-[day]");

/// One account as it is persisted in the users file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    /// Digest of the password, never the plaintext.
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(rename = "firstName", default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(rename = "lastName", default, deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(
        default,
        serialize_with = "dob_format::option::serialize",
        deserialize_with = "lenient_dob"
    )]
    pub dob: Option<Date>,
    #[serde(default, with = "empty_as_none")]
    pub avatar: Option<String>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            first_name: String::new(),
            last_name: String::new(),
            dob: None,
            avatar: None,
        }
    }

    /// Merge the supplied patch fields into this record.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(first) = &patch.first_name {
            self.first_name = first.clone();
        }
        if let Some(last) = &patch.last_name {
            self.last_name = last.clone();
        }
        if let Some(dob) = patch.dob {
            self.dob = dob;
        }
        if let Some(avatar) = &patch.avatar {
            self.avatar = avatar.clone();
        }
    }
}

/// Partial profile update. `None` leaves a field alone; for `dob` and
/// `avatar`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "present_dob")]
    pub dob: Option<Option<Date>>,
    #[serde(skip)]
    pub avatar: Option<Option<String>>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.dob.is_none()
            && self.avatar.is_none()
    }
}

// An explicit `null` must reach us as Some(None), so wrap whatever serde hands over.
fn present_dob<'de, D>(deserializer: D) -> Result<Option<Option<Date>>, D::Error>
where
    D: Deserializer<'de>,
{
    dob_format::option::deserialize(deserializer).map(Some)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Older files may hold unpadded dates or junk; anything unreadable becomes null.
fn lenient_dob<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(parse_loose_date))
}

fn parse_loose_date(raw: &str) -> Option<Date> {
    let mut parts = raw.trim().splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u8>().ok()?;
    let day = parts.next()?.parse::<u8>().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// Avatars are written as `""` when unset, matching older files.
mod empty_as_none {
    use super::*;

    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn serializes_with_wire_keys() {
        let mut rec = UserRecord::new("bob", "abc");
        rec.dob = Some(date!(1990 - 04 - 07));
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["username"], "bob");
        assert_eq!(value["password"], "abc");
        assert_eq!(value["firstName"], "");
        assert_eq!(value["lastName"], "");
        assert_eq!(value["dob"], "1990-04-07");
        assert_eq!(value["avatar"], "");
        assert!(value.get("password_hash").is_none());
    }

    #[test]
    fn legacy_record_without_optional_keys_gets_defaults() {
        let rec: UserRecord =
            serde_json::from_str(r#"{"username":"old","password":"ff"}"#).unwrap();
        assert_eq!(rec.first_name, "");
        assert_eq!(rec.last_name, "");
        assert_eq!(rec.dob, None);
        assert_eq!(rec.avatar, None);
    }

    #[test]
    fn null_dob_and_empty_avatar_read_as_none() {
        let rec: UserRecord = serde_json::from_str(
            r#"{"username":"u","password":"p","firstName":"","lastName":"","dob":null,"avatar":""}"#,
        )
        .unwrap();
        assert_eq!(rec.dob, None);
        assert_eq!(rec.avatar, None);
    }

    #[test]
    fn tolerates_null_names_and_loose_dates() {
        let rec: UserRecord = serde_json::from_str(
            r#"{"username":"bob","password":"p","firstName":null,"lastName":null,"dob":"1990-1-5"}"#,
        )
        .unwrap();
        assert_eq!(rec.first_name, "");
        assert_eq!(rec.last_name, "");
        assert_eq!(rec.dob, Some(date!(1990 - 01 - 05)));
        assert_eq!(serde_json::to_value(&rec).unwrap()["dob"], "1990-01-05");

        let rec: UserRecord = serde_json::from_str(
            r#"{"username":"bob","password":"p","dob":"someday"}"#,
        )
        .unwrap();
        assert_eq!(rec.dob, None);

        let rec: UserRecord =
            serde_json::from_str(r#"{"username":"bob","password":"p","dob":19900105}"#).unwrap();
        assert_eq!(rec.dob, None);
        assert_eq!(parse_loose_date("1990-02-30"), None);
    }

    #[test]
    fn patch_distinguishes_null_from_absent_dob() {
        let absent: ProfilePatch = serde_json::from_str(r#"{"first_name":"A"}"#).unwrap();
        assert_eq!(absent.dob, None);

        let cleared: ProfilePatch = serde_json::from_str(r#"{"dob":null}"#).unwrap();
        assert_eq!(cleared.dob, Some(None));

        let set: ProfilePatch = serde_json::from_str(r#"{"dob":"2000-01-31"}"#).unwrap();
        assert_eq!(set.dob, Some(Some(date!(2000 - 01 - 31))));
    }

    #[test]
    fn apply_only_touches_supplied_fields() {
        let mut rec = UserRecord::new("alice", "h");
        rec.last_name = "B".into();
        rec.dob = Some(date!(1985 - 12 - 01));

        rec.apply(&ProfilePatch {
            first_name: Some("A".into()),
            ..Default::default()
        });

        assert_eq!(rec.first_name, "A");
        assert_eq!(rec.last_name, "B");
        assert_eq!(rec.dob, Some(date!(1985 - 12 - 01)));
        assert_eq!(rec.password_hash, "h");
    }
}
