//! Canonical identifier derivation for metric names.
//!
//! Repository full names, label names and workflow names are embedded into
//! metric identifiers. The canonical form replaces every `/` with `_` and
//! strips `-`, `.` and spaces so repeated runs emit stable, comparable
//! time-series names. Two raw inputs that canonicalize to the same string are
//! intentionally treated as the same metric identity.

/// Derives the canonical metric identifier fragment from a raw name.
///
/// The transformation is idempotent: applying it to its own output yields the
/// same string.
///
/// # Examples
///
/// ```
/// use ghmon::canonical_name;
///
/// assert_eq!(canonical_name("my-org/My.Repo 2"), "myorg_MyRepo2");
/// assert_eq!(canonical_name("owner/repo"), "owner_repo");
/// ```
pub fn canonical_name(raw: &str) -> String {
    let mut canonical = String::with_capacity(raw.len());

    for candidate in raw.chars() {
        match candidate {
            '/' => canonical.push('_'),
            '-' | '.' | ' ' => {}
            other => canonical.push(other)
        }
    }

    canonical
}
