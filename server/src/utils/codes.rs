use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

const PAID_PREFIX: &str = "TKT";
const FREE_PREFIX: &str = "FREE";
const SUFFIX_LEN: usize = 6;
const MAX_REFERENCE_LEN: usize = 100;

fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

/// `TKT_<unix millis>_<6 alphanumerics>`, unique per payment attempt.
pub fn payment_reference(now: DateTime<Utc>) -> String {
    format!("{PAID_PREFIX}_{}_{}", now.timestamp_millis(), random_suffix(SUFFIX_LEN))
}

/// Reference recorded on purchases for free registrations.
pub fn free_reference(now: DateTime<Utc>) -> String {
    format!("{FREE_PREFIX}_{}_{}", now.timestamp_millis(), random_suffix(SUFFIX_LEN))
}

/// Ticket code: last six hex digits of the event id, then the distinguishing
/// tail of the reference (timestamp and random suffix).
pub fn ticket_code(event_id: Uuid, reference: &str) -> String {
    let event_hex = event_id.simple().to_string();
    let event_part = &event_hex[event_hex.len() - SUFFIX_LEN..];
    let tail: String = reference
        .split_once('_')
        .map_or(reference, |(_, rest)| rest)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    format!("{}-{}", event_part.to_ascii_uppercase(), tail.to_ascii_uppercase())
}

/// References arrive from unauthenticated callers; keep them to a safe alphabet.
pub fn is_valid_reference(reference: &str) -> bool {
    !reference.is_empty()
        && reference.len() <= MAX_REFERENCE_LEN
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// References minted by [`payment_reference`]. Free registrations never go
/// through the gateway, so their references are not accepted here.
pub fn is_payment_reference(reference: &str) -> bool {
    is_valid_reference(reference)
        && reference
            .strip_prefix(PAID_PREFIX)
            .is_some_and(|rest| rest.starts_with('_'))
}

/// Slugs supplied by organizers: lowercase alphanumerics separated by single dashes.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_REFERENCE_LEN
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// URL slug from a title plus a short random suffix.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let base = slug.trim_end_matches('-');
    let base = if base.is_empty() { "event" } else { base };
    format!("{base}-{}", random_suffix(SUFFIX_LEN).to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn payment_reference_has_expected_shape() {
        let reference = payment_reference(Utc::now());
        let parts: Vec<&str> = reference.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TKT");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn references_do_not_repeat_within_the_same_millisecond() {
        let now = Utc::now();
        let refs: HashSet<String> = (0..500).map(|_| payment_reference(now)).collect();
        assert_eq!(refs.len(), 500);
    }

    #[test]
    fn ticket_code_combines_event_and_reference() {
        let event_id = Uuid::parse_str("6f1c2d3e-0000-4000-8000-00000000abcd").unwrap();
        let code = ticket_code(event_id, "TKT_1700000000000_ab12cd");
        assert_eq!(code, "00ABCD-1700000000000AB12CD");
    }

    #[test]
    fn rejects_references_outside_alphabet() {
        assert!(is_valid_reference("TKT_1_ABCDEF"));
        assert!(!is_valid_reference(""));
        assert!(!is_valid_reference("../etc/passwd"));
        assert!(!is_valid_reference(&"A".repeat(101)));
    }

    #[test]
    fn only_checkout_references_are_payment_references() {
        assert!(is_payment_reference(&payment_reference(Utc::now())));
        assert!(!is_payment_reference(&free_reference(Utc::now())));
        assert!(!is_payment_reference("TKTX_1_ABCDEF"));
        assert!(!is_payment_reference("TKT_1/ABCDEF"));
    }

    #[test]
    fn slug_rules() {
        assert!(is_valid_slug("lagos-rust-2030"));
        assert!(!is_valid_slug("Lagos"));
        assert!(!is_valid_slug("-lagos"));
        assert!(!is_valid_slug("lagos--rust"));
        assert!(is_valid_slug(&slugify("Anything at all")));
    }

    #[test]
    fn slugify_collapses_punctuation() {
        let slug = slugify("Rust & Friends: Lagos!!");
        assert!(slug.starts_with("rust-friends-lagos-"));
        assert_eq!(slug.len(), "rust-friends-lagos-".len() + 6);
    }
}
