use std::collections::HashSet;

/// Canonical form of a cookie string: fragments split on `;`, trimmed,
/// sorted and joined with `"; "`.
#[must_use]
pub fn normalize_cookie_string(cookies: &str) -> String {
    let mut fragments: Vec<&str> = cookies.split(';').map(str::trim).collect();
    fragments.sort_unstable();
    fragments.join("; ")
}

/// True when every cookie string carries the same entries, ignoring order
/// and surrounding whitespace.
///
/// An empty input is vacuously equal.
pub fn are_all_cookie_strings_equal<I, S>(cookie_strings: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    cookie_strings
        .into_iter()
        .map(|cookies| normalize_cookie_string(cookies.as_ref()))
        .collect::<HashSet<_>>()
        .len()
        <= 1
}
