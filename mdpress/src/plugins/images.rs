//! Image plugins: remote image policy and local image embedding

use crate::url;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Regex to match an `<img>` tag.
static IMG_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("invalid img tag regex"));

/// Regex to match the `src` attribute inside a tag, quoted either way.
static SRC_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).expect("invalid src regex")
});

/// Largest image that is embedded (bytes)
const MAX_EMBED_SIZE: u64 = 20 * 1024 * 1024;

/// Value of the `src` attribute of an `<img>` tag
fn src_of(tag: &str) -> Option<String> {
    let captures = SRC_ATTR_RE.captures(tag)?;
    captures
        .get(2)
        .or_else(|| captures.get(3))
        .map(|m| m.as_str().replace("&amp;", "&"))
}

/// Whether an image source loads over the network
fn is_remote(src: &str) -> bool {
    let normalized = url::normalize(src);
    url::is_protocol_relative(&normalized)
        || matches!(url::scheme(&normalized), Some("http" | "https"))
}

/// Remove `<img>` tags whose source is `http(s)://` or protocol-relative
pub fn strip_remote_images(html: &str) -> String {
    IMG_TAG_RE
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            match src_of(tag) {
                Some(src) if is_remote(&src) => {
                    log::warn!("Skipping remote image {}", src);
                    String::new()
                }
                _ => tag.to_string(),
            }
        })
        .into_owned()
}

/// MIME type for an image file, from its extension
fn mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

/// Resolve a relative image source to a file below `base_dir`
///
/// Sources that carry a scheme, are protocol-relative, or escape the base
/// directory resolve to `None`.
fn resolve_local(src: &str, base_dir: &Path) -> Option<PathBuf> {
    let normalized = url::normalize(src);
    if url::scheme(&normalized).is_some() || url::is_protocol_relative(&normalized) {
        return None;
    }

    let relative = src.split(['?', '#']).next()?.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let base = base_dir.canonicalize().ok()?;
    let candidate = base.join(relative).canonicalize().ok()?;
    if candidate.starts_with(&base) {
        Some(candidate)
    } else {
        log::warn!("Image {} is outside {}", src, base.display());
        None
    }
}

/// Data URL for an image file
fn data_url(path: &Path) -> Option<String> {
    let mime = mime_type(path)?;
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if size > MAX_EMBED_SIZE {
        log::warn!("Image {} is too large to embed ({} bytes)", path.display(), size);
        return None;
    }

    match fs::read(path) {
        Ok(data) => Some(format!("data:{};base64,{}", mime, STANDARD.encode(&data))),
        Err(e) => {
            log::warn!("Failed to read image {}: {}", path.display(), e);
            None
        }
    }
}

/// Replace relative `<img src>` paths with base64 data URLs
///
/// # Parameters
/// * `html` - HTML fragment
/// * `base_dir` - Directory relative sources are resolved against
///
/// # Returns
/// * `String` - Fragment with every readable local image inlined; images
///   that cannot be resolved are left untouched
pub fn embed_local_images(html: &str, base_dir: &Path) -> String {
    IMG_TAG_RE
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            let Some(src) = src_of(tag) else {
                return tag.to_string();
            };
            if url::is_image_data(&url::normalize(&src)) || is_remote(&src) {
                return tag.to_string();
            }

            let Some(path) = resolve_local(&src, base_dir) else {
                log::warn!("Image not found: {}", src);
                return tag.to_string();
            };
            match data_url(&path) {
                Some(data) => {
                    log::debug!("Embedded image {}", path.display());
                    SRC_ATTR_RE
                        .replace(tag, |c: &Captures| format!("{}\"{}\"", &c[1], data))
                        .into_owned()
                }
                None => tag.to_string(),
            }
        })
        .into_owned()
}
