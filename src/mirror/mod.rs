//! URL to local path mapping for the mirrored site
//!
//! Every fetched URL is stored at a deterministic location under the output
//! root, and in-page links are rewritten to the same locations. The mapping:
//!
//! 1. An empty path, a trailing `/`, or a last segment without an extension
//!    gets `index.html` appended.
//! 2. A query string adds a short SHA-256 hash of the query to the file name
//!    (`index.html?x=1` becomes `index_<hash>.html`). Distinct queries get
//!    distinct files, but the query cannot be recovered from the file name.
//! 3. Every segment is sanitized with [`sanitize_segment`].
//! 4. The result is `root/<host>[_<port>]/<segments...>`.
//! 5. The joined path must stay lexically under the root, otherwise
//!    [`PathEscape`] is returned and nothing may be written.
//!
//! URLs without a host fall back to a hash-derived file under `root/_unparsed/`.

mod sanitize;

pub use sanitize::sanitize_segment;

use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;

/// File name used for directory-like URLs
pub const INDEX_FILE: &str = "index.html";

/// Directory (under the root) for URLs that cannot be mapped structurally
pub const UNPARSED_DIR: &str = "_unparsed";

/// Length of the query hash embedded in file names (hex characters)
const QUERY_HASH_LEN: usize = 12;

/// A mapped path would land outside the output root
#[derive(Debug, Error)]
#[error("Mapped path for {url} escapes the output root: {path}")]
pub struct PathEscape {
    pub url: String,
    pub path: String,
}

/// Where a URL lives in the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPath {
    /// Absolute (or root-relative, if the root is relative) file path
    pub file_path: PathBuf,

    /// Path of the file relative to the output root, `/`-separated with a leading `/`
    pub site_path: String,
}

/// Maps a URL to its location under `root`
///
/// This is a pure function: the same root and URL always produce the same path.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use url::Url;
/// use sumi_mirror::mirror::map_url;
///
/// let root = Path::new("/srv/mirror");
/// let mapped = map_url(root, &Url::parse("https://example.com/docs/").unwrap()).unwrap();
/// assert_eq!(mapped.site_path, "/example.com/docs/index.html");
/// assert_eq!(mapped.file_path, root.join("example.com/docs/index.html"));
/// ```
pub fn map_url(root: &Path, url: &Url) -> Result<MappedPath, PathEscape> {
    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return Ok(map_unparsed(root, url.as_str())),
    };

    let host_dir = match url.port() {
        Some(port) => sanitize_segment(&format!("{}_{}", host, port)),
        None => sanitize_segment(&host),
    };

    let mut segments: Vec<String> = url
        .path()
        .split('/')
        .skip_while(|s| s.is_empty())
        .map(str::to_string)
        .collect();

    // Rule 1: directory-like paths get an index file
    let last = segments.last().map(String::as_str).unwrap_or("");
    if last.is_empty() {
        segments.pop();
        segments.push(INDEX_FILE.to_string());
    } else if Path::new(last).extension().is_none() {
        segments.push(INDEX_FILE.to_string());
    }

    // Rule 2: query variants get distinct file names
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        if let Some(last) = segments.last_mut() {
            *last = with_query_hash(last, query);
        }
    }

    // Rule 3: sanitize independently
    let segments: Vec<String> = segments.iter().map(|s| sanitize_segment(s)).collect();

    join_under_root(root, url.as_str(), &host_dir, &segments)
}

/// Maps a raw URL string, falling back to a hash-derived name if it does not parse
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sumi_mirror::mirror::map_raw;
///
/// let mapped = map_raw(Path::new("out"), "http://[bad").unwrap();
/// assert!(mapped.site_path.starts_with("/_unparsed/"));
/// ```
pub fn map_raw(root: &Path, raw: &str) -> Result<MappedPath, PathEscape> {
    match Url::parse(raw) {
        Ok(url) => map_url(root, &url),
        Err(e) => {
            tracing::debug!("Unparsable URL {:?} mapped by hash: {}", raw, e);
            Ok(map_unparsed(root, raw))
        }
    }
}

/// Returns the relative reference from one mirrored file to another
///
/// Both arguments are `site_path` values. The result is usable as an `href`
/// inside the `from` document when the mirror is opened straight from disk.
///
/// # Examples
///
/// ```
/// use sumi_mirror::mirror::relative_href;
///
/// assert_eq!(
///     relative_href("/example.com/docs/index.html", "/example.com/img/logo.png"),
///     "../img/logo.png"
/// );
/// assert_eq!(
///     relative_href("/example.com/index.html", "/example.com/about/index.html"),
///     "about/index.html"
/// );
/// ```
pub fn relative_href(from_site_path: &str, to_site_path: &str) -> String {
    let from: Vec<&str> = from_site_path.trim_start_matches('/').split('/').collect();
    let to: Vec<&str> = to_site_path.trim_start_matches('/').split('/').collect();

    let from_dir = &from[..from.len().saturating_sub(1)];
    let common = from_dir
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count()
        .min(to.len().saturating_sub(1));

    let mut parts: Vec<String> = vec!["..".to_string(); from_dir.len() - common];
    parts.extend(to[common..].iter().map(|s| s.replace('%', "%25")));
    parts.join("/")
}

/// Inserts a short hash of `query` before the file extension of `name`
fn with_query_hash(name: &str, query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let hash = hex::encode(digest);
    let hash = &hash[..QUERY_HASH_LEN];

    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{}{}", &name[..dot], hash, &name[dot..]),
        _ => format!("{}_{}", name, hash),
    }
}

fn map_unparsed(root: &Path, raw: &str) -> MappedPath {
    let name = hex::encode(Sha256::digest(raw.as_bytes()));
    MappedPath {
        file_path: root.join(UNPARSED_DIR).join(&name),
        site_path: format!("/{}/{}", UNPARSED_DIR, name),
    }
}

/// Joins sanitized parts under the root, rejecting anything that is not a plain name
fn join_under_root(
    root: &Path,
    url: &str,
    host_dir: &str,
    segments: &[String],
) -> Result<MappedPath, PathEscape> {
    let relative: PathBuf = std::iter::once(host_dir)
        .chain(segments.iter().map(String::as_str))
        .collect();

    let contained = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));

    if !contained || relative.components().count() != segments.len() + 1 {
        return Err(PathEscape {
            url: url.to_string(),
            path: root.join(&relative).display().to_string(),
        });
    }

    let mut site_path = format!("/{}", host_dir);
    for segment in segments {
        site_path.push('/');
        site_path.push_str(segment);
    }

    Ok(MappedPath {
        file_path: root.join(relative),
        site_path,
    })
}
