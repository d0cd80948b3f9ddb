//! Channel name normalization
//!
//! Mattermost channel names (the URL handle, not the display name) must be
//! 2-64 characters of lowercase ASCII letters, digits and single dashes, and
//! may not start or end with a dash. Slack names and user-entered titles do
//! not follow these rules, so every name passes through [`normalize`] before
//! it reaches the host.

use regex::Regex;
use std::sync::OnceLock;

/// Shortest name the host accepts
pub const MIN_LEN: usize = 2;

/// Longest name the host accepts
pub const MAX_LEN: usize = 64;

/// Prefix used when nothing usable survives normalization
const FALLBACK_PREFIX: &str = "ch-";

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid channel name regex"))
}

/// Random lowercase alphanumeric token of `len` characters (max 32).
fn random_token(len: usize) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..len.min(id.len())].to_string()
}

/// Map to lowercase ASCII and single inner dashes, with no random padding.
fn clean(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());

    for c in name.chars() {
        let mapped = match c {
            'a'..='z' | '0'..='9' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            ' ' | '_' | '.' | '-' => '-',
            _ => continue,
        };
        if mapped == '-' && (cleaned.is_empty() || cleaned.ends_with('-')) {
            continue;
        }
        cleaned.push(mapped);
    }

    while cleaned.ends_with('-') {
        cleaned.pop();
    }
    cleaned
}

/// Normalize an arbitrary string into a valid channel name.
///
/// Letters are lowercased, digits kept, and space, underscore, dot and dash
/// become a single dash. Every other character is dropped. Runs of dashes
/// collapse and leading/trailing dashes are trimmed. An empty result is
/// replaced by `ch-` plus six random characters; a one-character result gets
/// `-` plus two random characters appended. The output is capped at 64
/// characters.
///
/// Already-valid names come back unchanged.
pub fn normalize(name: &str) -> String {
    let mut cleaned = clean(name);

    if cleaned.is_empty() {
        cleaned = format!("{}{}", FALLBACK_PREFIX, random_token(6));
    }

    if cleaned.len() < MIN_LEN {
        cleaned = format!("{}-{}", cleaned, random_token(2));
    }

    if cleaned.len() > MAX_LEN {
        // Only ASCII remains at this point, so byte truncation is safe
        cleaned.truncate(MAX_LEN);
        while cleaned.ends_with('-') {
            cleaned.pop();
        }
    }

    cleaned
}

/// Whether [`normalize`] maps `name` to the same result every time.
///
/// False when random characters have to be generated, so looking the result
/// up again will not find a channel created from it earlier.
pub fn is_deterministic(name: &str) -> bool {
    clean(name).len() >= MIN_LEN
}

/// Check whether `name` already satisfies the host's channel name rules.
pub fn is_valid_channel_name(name: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&name.len()) && name_regex().is_match(name)
}
