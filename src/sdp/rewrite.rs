//! Identity substitution inside session-description text
//!
//! Swaps stream identifiers between their internal and external spellings on
//! the attribute lines that carry them, leaving every other line untouched.
//! Substitution is whole-token: an identifier that merely appears as a
//! substring of some other token (a fingerprint, an ICE credential) is never
//! rewritten. Applying the same substitution twice yields the same text,
//! since the replacement values are not keys of a live identity map.

use std::collections::HashMap;

/// Attribute lines that carry stream identifiers
const IDENTIFIER_ATTRIBUTES: [&str; 3] = ["a=msid:", "a=ssrc:", "a=msid-semantic:"];

fn carries_identifiers(line: &str) -> bool {
    IDENTIFIER_ATTRIBUTES
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// Replace whole-token identifier matches on identifier-carrying lines.
///
/// `ids` maps each identifier to its replacement; tokens absent from the map
/// pass through unchanged. The original line-ending convention is preserved.
pub fn substitute_stream_ids(sdp: &str, ids: &HashMap<String, String>) -> String {
    if ids.is_empty() || sdp.is_empty() {
        return sdp.to_string();
    }

    let line_ending = if sdp.contains("\r\n") { "\r\n" } else { "\n" };
    let rewritten: Vec<String> = sdp
        .lines()
        .map(|line| {
            if carries_identifiers(line) {
                rewrite_line(line, ids)
            } else {
                line.to_string()
            }
        })
        .collect();

    let mut out = rewritten.join(line_ending);
    if sdp.ends_with('\n') {
        out.push_str(line_ending);
    }
    out
}

fn rewrite_line(line: &str, ids: &HashMap<String, String>) -> String {
    line.split(' ')
        .map(|token| rewrite_token(token, ids))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identifiers appear either as a bare token ("a=msid-semantic: WMS <id>")
/// or as the value of a colon-prefixed field ("a=msid:<id>", "msid:<id>").
fn rewrite_token(token: &str, ids: &HashMap<String, String>) -> String {
    if let Some(replacement) = ids.get(token) {
        return replacement.clone();
    }
    if let Some((head, tail)) = token.rsplit_once(':') {
        if let Some(replacement) = ids.get(tail) {
            return format!("{}:{}", head, replacement);
        }
    }
    token.to_string()
}
