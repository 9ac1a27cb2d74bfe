//! Redirect resolution.

use http::header::LOCATION;
use http::{HeaderMap, StatusCode, Uri};

/// Hops followed before a request is abandoned.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Statuses whose `Location` is followed.
pub fn is_followed(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Target of a redirect response, resolved against the request URI.
pub fn next_location(base: &Uri, headers: &HeaderMap) -> Option<Uri> {
    let location = headers.get(LOCATION)?.to_str().ok()?;
    resolve(base, location)
}

/// Resolve `location` (absolute, scheme-relative, absolute-path or
/// relative-path) against `base`.
pub fn resolve(base: &Uri, location: &str) -> Option<Uri> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    if let Ok(uri) = location.parse::<Uri>() {
        if uri.scheme().is_some() && uri.authority().is_some() {
            return Some(uri);
        }
    }

    let scheme = base.scheme_str()?;
    if let Some(rest) = location.strip_prefix("//") {
        return format!("{scheme}://{rest}").parse().ok();
    }

    let authority = base.authority()?;
    let path = if location.starts_with('/') {
        location.to_string()
    } else {
        let dir = base.path().rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        format!("{dir}/{location}")
    };
    format!("{scheme}://{authority}{path}").parse().ok()
}
