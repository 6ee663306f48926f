use chrono::NaiveTime;

pub const MIN_PASSWORD_LEN: usize = 8;

/// `local@domain.tld` with no whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn is_strong_enough(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// Lowercase, whitespace runs to `-`, then drop anything outside `[a-z0-9-]`.
pub fn clean_subdomain(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let dashed = lowered.split_whitespace().collect::<Vec<_>>().join("-");
    dashed
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// First word is the first name, the rest is the last name.
pub fn split_full_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or(full.trim()).to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// `HH:MM` or `HH:MM:SS`.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Treats `None` and blank strings alike.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("admin@acme.com"));
        assert!(is_valid_email("a.b+c@mail.acme.co"));
        assert!(!is_valid_email("admin@acme"));
        assert!(!is_valid_email("@acme.com"));
        assert!(!is_valid_email("admin acme@x.com"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("admin@.com"));
    }

    #[test]
    fn password_length() {
        assert!(!is_strong_enough("short"));
        assert!(is_strong_enough("exactly8"));
    }

    #[test]
    fn subdomain_is_normalized() {
        assert_eq!(clean_subdomain("  Acme   Corp "), "acme-corp");
        assert_eq!(clean_subdomain("Café_Bar!"), "cafbar");
        assert_eq!(clean_subdomain("team-42"), "team-42");
        assert_eq!(clean_subdomain("!!!"), "");
    }

    #[test]
    fn full_name_split() {
        assert_eq!(split_full_name("Sara"), ("Sara".into(), "".into()));
        assert_eq!(
            split_full_name("  Omar  Al   Farsi "),
            ("Omar".into(), "Al Farsi".into())
        );
    }

    #[test]
    fn clock_formats() {
        assert_eq!(parse_clock("08:30"), NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(parse_clock("17:00:15"), NaiveTime::from_hms_opt(17, 0, 15));
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("8am"), None);
    }

    #[test]
    fn blank_strings_are_missing() {
        assert_eq!(non_blank(&Some("  x ".into())), Some("x"));
        assert_eq!(non_blank(&Some("   ".into())), None);
        assert_eq!(non_blank(&None), None);
    }
}
