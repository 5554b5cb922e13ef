//! Server host detection

/// True when `host` ends with one of `suffixes`, ignoring case
///
/// A fully qualified host with a trailing dot matches as well.
pub fn is_tracked_host<S: AsRef<str>>(host: &str, suffixes: &[S]) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host).to_ascii_lowercase();
    if host.is_empty() {
        return false;
    }

    suffixes.iter().any(|suffix| {
        let suffix = suffix.as_ref().to_ascii_lowercase();
        !suffix.is_empty() && host.ends_with(&suffix)
    })
}
