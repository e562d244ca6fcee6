//! Canonical resolution of raw link text
//!
//! `resolve` turns a raw `href` value found on a page into the canonical
//! absolute URL used for deduplication, or a `Skip` when the link is not
//! crawlable at all. It is a pure function: no I/O, deterministic for any
//! input, and safe to fuzz in isolation.

use thiserror::Error;
use url::{ParseError, Url};

/// Schemes the crawler will follow.
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Tokens that mark a scheme-less path as an unfollowable pseudo-link.
/// These show up verbatim at the start of hrefs like `tel: 555-0100`.
const INVALID_SCHEME_TOKENS: &[&str] = &["tel:", "mailto:", "javascript:", "data:"];

/// Reasons a raw link is dropped rather than resolved.
///
/// A `Skip` is not an error: the caller silently discards the link. It is
/// typed so tests can assert on why a given href was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Skip {
    #[error("empty or placeholder href")]
    Empty,

    #[error("disallowed scheme: {0}")]
    DisallowedScheme(String),

    #[error("invalid scheme token embedded in path")]
    InvalidSchemeToken,

    #[error("unparseable link text")]
    Unparseable,
}

/// Resolves a raw link found on `parent` into a canonical absolute URL.
///
/// Resolution rules:
/// - Links whose scheme is outside the allowed set (`http`, `https`) are
///   skipped, as are pseudo-links (`tel:`, `mailto:`, and friends) hiding at
///   the start of a scheme-less path.
/// - A link with a network location but no scheme (`//host/path`) adopts the
///   parent's scheme.
/// - A link with neither scheme nor network location adopts the parent's
///   scheme and host; a leading `/` is taken as an absolute path, anything
///   else is joined onto the parent's directory.
/// - The five-part result (scheme, host, path, query, fragment) is
///   reassembled with dot segments (`.`/`..`) collapsed and redundant
///   separators removed.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use linkscan::url::resolve;
///
/// let parent = Url::parse("https://host/a/b").unwrap();
/// let resolved = resolve(&parent, "baz").unwrap();
/// assert_eq!(resolved.as_str(), "https://host/a/baz");
/// ```
pub fn resolve(parent: &Url, raw: &str) -> Result<Url, Skip> {
    let raw = raw.trim();

    // Absent hrefs surface from the parser as empty placeholders.
    if raw.is_empty() || raw == "None" {
        return Err(Skip::Empty);
    }

    match Url::parse(raw) {
        Ok(absolute) => {
            if ALLOWED_SCHEMES.contains(&absolute.scheme()) {
                Ok(absolute)
            } else {
                Err(Skip::DisallowedScheme(absolute.scheme().to_string()))
            }
        }
        // No scheme: either protocol-relative (`//host/x`) or a plain
        // relative path. Both adopt from the parent, but a pseudo-scheme
        // token at the start of the path means the href was never a real
        // link in the first place.
        Err(ParseError::RelativeUrlWithoutBase) => {
            if INVALID_SCHEME_TOKENS
                .iter()
                .any(|token| raw.starts_with(token))
            {
                return Err(Skip::InvalidSchemeToken);
            }

            let joined = parent.join(raw).map_err(|_| Skip::Unparseable)?;
            if ALLOWED_SCHEMES.contains(&joined.scheme()) {
                Ok(joined)
            } else {
                Err(Skip::DisallowedScheme(joined.scheme().to_string()))
            }
        }
        Err(_) => Err(Skip::Unparseable),
    }
}
