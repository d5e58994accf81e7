//! URL normalization and link filtering for the crawler.
//!
//! A normalized URL is `scheme://host[:port]/path` with the query and
//! fragment dropped and no trailing slash. The site root normalizes to
//! `scheme://host`.

use url::Url;

/// File extensions that never hold a trackable HTML page
const SKIPPED_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "bmp", "css", "js", "mjs", "json",
    "xml", "rss", "txt", "zip", "gz", "tar", "rar", "7z", "mp3", "mp4", "wav", "avi", "mov",
    "webm", "woff", "woff2", "ttf", "otf", "eot", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "csv", "exe", "dmg", "apk",
];

/// Path prefixes for CMS plumbing that is never worth a page of the budget
const SKIPPED_PATH_PREFIXES: &[&str] = &["/wp-admin", "/wp-json", "/wp-content", "/cdn-cgi", "/feed", "/xmlrpc.php"];

/// Normalize a URL, returning `None` for anything that isn't an absolute http(s) URL
pub fn normalize_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    normalize_parsed(url)
}

fn normalize_parsed(mut url: Url) -> Option<String> {
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    url.set_query(None);
    url.set_fragment(None);

    let mut normalized = url.to_string();
    while normalized.ends_with('/') {
        normalized.pop();
    }
    Some(normalized)
}

/// Prefix `https://` when the input carries no scheme, so `example.com`
/// is accepted wherever a URL is asked for
pub fn with_default_scheme(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Resolve an `href` found on `base` into a normalized absolute URL
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    normalize_parsed(resolve_href(base, href)?)
}

/// Resolve an `href` found on `base` without normalizing, so the result
/// still works as a base for the links on the page it points to
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    // Skip empty, fragment-only and non-navigational schemes
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") || resolved.host_str().is_none() {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}

/// True when the URL has no path beyond the root
pub fn is_homepage(url: &Url) -> bool {
    let path = url.path();
    path.is_empty() || path == "/"
}

pub fn is_same_host(url: &str, host: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(host)))
        .unwrap_or(false)
}

/// True for static assets and CMS endpoints the crawler should not spend budget on
pub fn is_skipped_resource(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return true;
    };
    let path = parsed.path().to_ascii_lowercase();

    if SKIPPED_PATH_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        return true;
    }

    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, ext)) => SKIPPED_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// Join a site-relative path onto the origin of `base` and normalize it
pub fn join_path(base: &Url, path: &str) -> Option<String> {
    normalize_parsed(base.join(path).ok()?)
}
