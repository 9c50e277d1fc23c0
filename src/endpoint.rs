//! Endpoint resolution: combine a configured API base with request paths,
//! refusing to aim a non-local caller at a loopback address.
//!
//! ## Why the loopback guard?
//!
//! The API base is configuration, and configuration leaks: a stale
//! `http://localhost:3000` base deployed to a public host would silently
//! redirect every engine call to whatever happens to listen on the
//! server's own loopback interface — a classic SSRF foothold. When the
//! resolver knows the hostname its caller is served from and that hostname
//! is *not* loopback, any resolution landing on loopback is discarded and
//! the original path returned unchanged. Resolution failures degrade the
//! same way: the caller always gets *a* path back, never an error.

use reqwest::Url;

/// Resolves request paths against an optional configured base URL.
#[derive(Debug, Clone, Default)]
pub struct EndpointResolver {
    base: Option<String>,
    origin_host: Option<String>,
}

impl EndpointResolver {
    /// Create a resolver.
    ///
    /// * `configured_base` — base URL to resolve against; empty or
    ///   whitespace-only means "no base", making [`resolve`] the identity.
    /// * `origin_host` — hostname the calling context is served from, when
    ///   observable. `None` (the usual case outside a browser-style host)
    ///   skips the loopback guard entirely.
    ///
    /// [`resolve`]: EndpointResolver::resolve
    pub fn new(configured_base: Option<&str>, origin_host: Option<&str>) -> Self {
        Self {
            base: configured_base
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_owned),
            origin_host: origin_host
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_owned),
        }
    }

    /// Resolve `path` to an absolute URL string.
    ///
    /// Returns `path` unchanged when there is no base, when URL
    /// construction fails, or when the guard blocks a loopback target.
    /// Never errors.
    pub fn resolve(&self, path: &str) -> String {
        let Some(base) = self.base.as_deref() else {
            return path.to_string();
        };

        let resolved = match Url::parse(base).and_then(|base| base.join(path)) {
            Ok(url) => url,
            Err(_) => return path.to_string(),
        };

        if let Some(origin) = self.origin_host.as_deref() {
            let target_is_loopback = resolved.host_str().is_some_and(is_loopback_host);
            if target_is_loopback && !is_loopback_host(origin) {
                return path.to_string();
            }
        }

        String::from(resolved)
    }
}

/// Whether a hostname refers to the local host.
///
/// Loopback means: an IP literal whose address is loopback (`127.0.0.0/8`,
/// `::1`, with or without brackets), the name `localhost`, or any
/// `*.localhost` subdomain. A domain that merely *starts* with `127.`
/// (e.g. `127.not-a-loopback.com`) is not an IP literal and not loopback.
pub fn is_loopback_host(host: &str) -> bool {
    let host = host.trim().trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return ip.is_loopback();
    }
    let host = host.to_ascii_lowercase();
    host == "localhost" || host.ends_with(".localhost")
}
