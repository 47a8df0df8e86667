//! Display-name resolution for party snapshots.

/// Resolve a party's display name from optional first/last name parts.
///
/// Parts are trimmed, empty parts dropped, and the remainder space-joined.
/// Returns `None` when neither part carries anything printable.
pub fn display_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let joined = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
