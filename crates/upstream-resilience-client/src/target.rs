//! URL resolution and breaker keys.

use url::Url;

/// True if `target` starts with `http://` or `https://`, in any case.
pub fn has_scheme(target: &str) -> bool {
    starts_with_ignore_case(target, "http://") || starts_with_ignore_case(target, "https://")
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Resolves a call target against an optional base URL.
///
/// Absolute targets are returned unchanged. Relative targets are appended to
/// `base`: a `/` is inserted only when neither side has one and the target is
/// not a query or fragment, and a doubled `/` at the join loses one slash.
/// Without a base the target is returned as given.
pub fn resolve_url(base: Option<&str>, target: &str) -> String {
    if has_scheme(target) {
        return target.to_string();
    }
    match base {
        Some(base) if !base.is_empty() => {
            let base_slash = base.ends_with('/');
            if base_slash && target.starts_with('/') {
                format!("{base}{}", &target[1..])
            } else if !base_slash && !target.is_empty() && !target.starts_with(['/', '?', '#']) {
                format!("{base}/{target}")
            } else {
                format!("{base}{target}")
            }
        }
        _ => target.to_string(),
    }
}

/// The breaker key for `url`: its host, plus the port when one is explicit
/// and not the scheme default.
///
/// Returns `None` when the URL does not parse or has no host.
pub fn target_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }
    let host = host.to_ascii_lowercase();
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}
