//! Minimal URL helpers for callers that hold a full page URL.
//!
//! These work directly on string slices and never allocate.

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();
    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    None
}

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for (i, &b) in bytes.iter().enumerate().skip(scheme_end) {
        if b == b'@' {
            host_start = i + 1;
            break;
        }
        if b == b'/' || b == b'?' || b == b'#' {
            break;
        }
    }

    // IPv6 literal: the host runs through the closing bracket
    let mut scan_from = host_start;
    if bytes.get(host_start) == Some(&b'[') {
        if let Some(close) = url[host_start..].find(']') {
            scan_from = host_start + close + 1;
        }
    }

    let mut host_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(scan_from) {
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Extract the hostname from a URL, as a slice of the input.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    Some(&url[host_start..host_end])
}

/// Hostname as the browser reports it: lowercase, no trailing dot.
pub fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}
