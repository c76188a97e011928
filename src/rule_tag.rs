//! In-band provenance tags carried in a firewall rule's description field.
//!
//! The description is the system's only persistence mechanism: a rule tagged
//! `bot=true;u=<name>;dt=<timestamp>` was created by this program and becomes
//! eligible for automatic revocation once the timestamp falls out of the
//! retention window. Rules without the marker were configured manually and
//! must never be touched.

use chrono::NaiveDateTime;

/// Marker distinguishing automatically managed rules from manual ones.
pub const MARKER: &str = "bot=true";

/// Hard limit imposed by the provider on the description field.
pub const DESCRIPTION_LIMIT: usize = 255;

/// Second-precision, UTC-naive. Colons are not accepted by the provider's
/// description field, hence the dashes in the time part.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// A decoded, well-formed tag. Malformed descriptions never materialize as
/// this type; they decode to `None` and stay inert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTag {
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

/// Encodes a tag for a new rule. The result is truncated to the provider's
/// 255-character limit; an overlong display name can therefore cut into the
/// timestamp, leaving a tag the sweeper will never consider expired.
pub fn encode(created_by: &str, created_at: NaiveDateTime) -> String {
    let tag = format!(
        "{MARKER};u={created_by};dt={}",
        created_at.format(TIMESTAMP_FORMAT)
    );

    match tag.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((cut, _)) => tag[..cut].to_string(),
        None => tag,
    }
}

/// Decodes a rule description. Returns `None` unless the marker is present
/// and both the `u` and `dt` keys parse; when a key repeats, the last
/// occurrence wins. Malformed input is never an error, only a non-tag.
pub fn decode(description: &str) -> Option<RuleTag> {
    if !description.contains(MARKER) {
        return None;
    }

    let mut created_by = None;
    let mut created_at_raw = None;

    for segment in description.split(';') {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        match key {
            "u" => created_by = Some(value),
            "dt" => created_at_raw = Some(value),
            _ => (),
        }
    }

    let created_at = NaiveDateTime::parse_from_str(created_at_raw?, TIMESTAMP_FORMAT).ok()?;

    Some(RuleTag {
        created_by: created_by?.to_string(),
        created_at,
    })
}
