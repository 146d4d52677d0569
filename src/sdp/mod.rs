//! Minimal session-description text accessor
//!
//! Touches only the fields the compatibility layer needs: media-section
//! boundaries, the origin line, per-section attribute values, and the
//! identifier-carrying attribute lines handled in [`rewrite`]. This is not a
//! general SDP parser; anything else in the text passes through untouched.

pub mod rewrite;

/// Split a description into its media sections. The session part before the
/// first `m=` line is not a media section and is excluded.
pub fn media_sections(sdp: &str) -> Vec<&str> {
    let mut starts = Vec::new();
    for (idx, _) in sdp.match_indices("m=") {
        if idx == 0 || sdp.as_bytes()[idx - 1] == b'\n' {
            starts.push(idx);
        }
    }

    let mut sections = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(sdp.len());
        sections.push(&sdp[start..end]);
    }
    sections
}

/// Media type of a section's `m=` line ("audio", "video", "application", ...)
pub fn media_kind(section: &str) -> Option<&str> {
    let m_line = section.lines().next()?.strip_prefix("m=")?;
    m_line.split_whitespace().next()
}

/// Transport proto field of a section's `m=` line (e.g. "UDP/DTLS/SCTP")
pub fn media_proto(section: &str) -> Option<&str> {
    let m_line = section.lines().next()?.strip_prefix("m=")?;
    m_line.split_whitespace().nth(2)
}

/// Value of the first `a=<name>:` attribute within a section
pub fn attribute_value<'a>(section: &'a str, name: &str) -> Option<&'a str> {
    let prefix = format!("a={}:", name);
    section
        .lines()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .map(str::trim)
}

/// Username field of the `o=` origin line
pub fn origin_username(sdp: &str) -> Option<&str> {
    let origin = sdp.lines().find_map(|line| line.strip_prefix("o="))?;
    origin.split_whitespace().next()
}
