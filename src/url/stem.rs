use url::Url;

/// Derives the root-stem grouping key for a URL.
///
/// For hosts inside the scan's scope the stem is `host/first-path-segment`,
/// which groups URLs belonging to the same section of a site. Off-scope hosts
/// (and root pages with no path segment) collapse to the bare hostname.
///
/// # Arguments
///
/// * `url` - The canonical URL
/// * `host_in_scope` - Whether the URL's host satisfies the scan's host pattern
pub fn root_stem(url: &Url, host_in_scope: bool) -> String {
    let host = url.host_str().unwrap_or_default();

    if host_in_scope {
        if let Some(first) = url.path_segments().and_then(|mut segments| segments.next()) {
            if !first.is_empty() {
                return format!("{}/{}", host, first);
            }
        }
    }

    host.to_string()
}
