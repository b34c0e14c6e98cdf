use std::sync::LazyLock;

use regex::Regex;

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([a-zA-Z0-9._-]+)").expect("Invalid mention regex"));

/// Usernames mentioned in `body`, deduplicated, in first-seen order
pub fn extract_mentions(body: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for capture in MENTION.captures_iter(body) {
        let username = &capture[1];
        if !seen.iter().any(|s| s == username) {
            seen.push(username.to_string());
        }
    }
    seen
}
