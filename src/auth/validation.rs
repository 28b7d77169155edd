use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::date, Date, OffsetDateTime};

const MAX_NAME_LEN: usize = 100;
const EARLIEST_DOB: Date = date!(1900 - 01 - 01);

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{1,64}$").unwrap();
    }
    USERNAME_RE.is_match(username) && username != "." && username != ".."
}

/// Returns the first rule the password breaks, if any.
pub(crate) fn password_problem(password: &str, min_len: usize) -> Option<String> {
    if password.is_empty() {
        return Some("Password cannot be empty".into());
    }
    if password.chars().count() < min_len {
        return Some(format!("Password must be at least {min_len} characters"));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Some("Password must contain an uppercase letter".into());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Some("Password must contain a lowercase letter".into());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must contain a digit".into());
    }
    if password.chars().all(|c| c.is_alphanumeric()) {
        return Some("Password must contain a special character".into());
    }
    None
}

pub(crate) fn is_valid_name(name: &str) -> bool {
    name.chars().count() <= MAX_NAME_LEN
}

pub(crate) fn is_valid_dob(dob: Date) -> bool {
    dob >= EARLIEST_DOB && dob <= OffsetDateTime::now_utc().date()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(is_valid_username("bob"));
        assert!(is_valid_username("a.b-c_9"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("../etc"));
        assert!(!is_valid_username(".."));
        assert!(!is_valid_username(&"x".repeat(65)));
    }

    #[test]
    fn password_rules() {
        assert_eq!(password_problem("Secret123!", 8), None);
        assert!(password_problem("", 8).unwrap().contains("empty"));
        assert!(password_problem("Se1!", 8).unwrap().contains("at least 8"));
        assert!(password_problem("secret123!", 8).unwrap().contains("uppercase"));
        assert!(password_problem("SECRET123!", 8).unwrap().contains("lowercase"));
        assert!(password_problem("Secretttt!", 8).unwrap().contains("digit"));
        assert!(password_problem("Secret1234", 8).unwrap().contains("special"));
    }

    #[test]
    fn dob_bounds() {
        assert!(is_valid_dob(date!(1990 - 05 - 17)));
        assert!(!is_valid_dob(date!(1899 - 12 - 31)));
        let tomorrow = OffsetDateTime::now_utc().date().next_day().unwrap();
        assert!(!is_valid_dob(tomorrow));
    }

    #[test]
    fn name_length() {
        assert!(is_valid_name(""));
        assert!(is_valid_name(&"n".repeat(100)));
        assert!(!is_valid_name(&"n".repeat(101)));
    }
}
