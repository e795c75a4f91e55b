//! Locator construction
//!
//! Turns caller paths into path-addressed drive locators:
//!
//! ```text
//! ""              -> /me/drive/root
//! "docs/a.txt"    -> /me/drive/root:/docs/a.txt
//! reference ""    -> /me/drive/root:
//! action children -> /me/drive/root:/docs:/children   (root: /me/drive/root/children)
//! ```
//!
//! Locators are relative; the request executor resolves them against the API
//! base URL. Path segments are percent-encoded so names holding `#`, `%` or
//! spaces address the item itself.

use crate::error::{OneDriveError, Result};

/// Path-addressed drive root
pub const ROOT: &str = "/me/drive/root";

/// Characters the drive rejects in item names
pub const RESERVED_CHARS: [char; 7] = ['"', '*', ':', '<', '>', '?', '|'];

/// What the locator addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// The item itself
    Item,
    /// The item as a `parentReference.path` value; always carries a colon
    Reference,
    /// A sub-resource or function of the item, e.g. `children` or `createLink`
    Named(&'a str),
}

/// Reject paths containing any reserved character.
pub fn validate_path(path: &str) -> Result<()> {
    match path.chars().find(|c| RESERVED_CHARS.contains(c)) {
        Some(character) => Err(OneDriveError::InvalidPath {
            path: path.to_string(),
            character,
        }),
        None => Ok(()),
    }
}

/// Normalise separators and dot segments; the result always starts with `/`.
///
/// ```
/// use provider_onedrive::endpoint::clean_path;
///
/// assert_eq!(clean_path("a//b/./c/../d/"), "/a/b/d");
/// assert_eq!(clean_path("\\docs\\x.txt"), "/docs/x.txt");
/// assert_eq!(clean_path("."), "/");
/// ```
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    format!("/{}", segments.join("/"))
}

pub fn is_root(path: &str) -> bool {
    clean_path(path) == "/"
}

/// Parent directory of `path`, cleaned; the parent of a top-level entry is `/`.
pub fn parent_path(path: &str) -> String {
    let cleaned = clean_path(path);
    match cleaned.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}

/// Final segment of `path`; empty for the root.
pub fn file_name(path: &str) -> String {
    let cleaned = clean_path(path);
    cleaned.rsplit('/').next().unwrap_or_default().to_string()
}

/// Build the locator for `path`.
///
/// Fails with [`OneDriveError::InvalidPath`] before any cleaning when the
/// path contains a reserved character.
pub fn build(path: &str, action: Action<'_>, params: &[(&str, &str)]) -> Result<String> {
    validate_path(path)?;

    let cleaned = clean_path(path);
    let encoded: Vec<_> = cleaned
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(urlencoding::encode)
        .collect();
    let composed = format!("{}:/{}", ROOT, encoded.join("/"));
    let mut locator = composed.trim_end_matches([':', '/']).to_string();

    match action {
        Action::Item => {}
        Action::Reference => {
            if !locator.contains(':') {
                locator.push(':');
            }
        }
        Action::Named(name) => {
            let base = locator.trim_end_matches(':');
            locator = if base.contains(':') {
                format!("{}:/{}", base, name)
            } else {
                format!("{}/{}", base, name)
            };
        }
    }

    if !params.is_empty() {
        let query: Vec<String> = params
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect();
        locator.push('?');
        locator.push_str(&query.join("&"));
    }

    Ok(locator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_locators() {
        assert_eq!(build("", Action::Item, &[]).unwrap(), "/me/drive/root");
        assert_eq!(build("/", Action::Item, &[]).unwrap(), "/me/drive/root");
        assert_eq!(
            build("docs/a.txt", Action::Item, &[]).unwrap(),
            "/me/drive/root:/docs/a.txt"
        );
        assert_eq!(
            build("//docs//a.txt/", Action::Item, &[]).unwrap(),
            "/me/drive/root:/docs/a.txt"
        );
    }

    #[test]
    fn test_reference_locators() {
        assert_eq!(build("", Action::Reference, &[]).unwrap(), "/me/drive/root:");
        assert_eq!(
            build("dst", Action::Reference, &[]).unwrap(),
            "/me/drive/root:/dst"
        );
    }

    #[test]
    fn test_named_actions() {
        assert_eq!(
            build("docs", Action::Named("children"), &[]).unwrap(),
            "/me/drive/root:/docs:/children"
        );
        assert_eq!(
            build("", Action::Named("children"), &[]).unwrap(),
            "/me/drive/root/children"
        );
        assert_eq!(
            build("a.txt", Action::Named("permissions/aTowIzY"), &[]).unwrap(),
            "/me/drive/root:/a.txt:/permissions/aTowIzY"
        );
    }

    #[test]
    fn test_query_params() {
        assert_eq!(
            build("a.txt", Action::Item, &[("expand", "permissions")]).unwrap(),
            "/me/drive/root:/a.txt?expand=permissions"
        );
        assert_eq!(
            build("a.docx", Action::Named("content"), &[("format", "pdf")]).unwrap(),
            "/me/drive/root:/a.docx:/content?format=pdf"
        );
        assert_eq!(
            build("", Action::Item, &[("q", "a b&c")]).unwrap(),
            "/me/drive/root?q=a%20b%26c"
        );
    }

    #[test]
    fn test_segments_percent_encoded() {
        assert_eq!(
            build("reports/q1#final.pdf", Action::Item, &[]).unwrap(),
            "/me/drive/root:/reports/q1%23final.pdf"
        );
        assert_eq!(
            build("100%/my notes.txt", Action::Item, &[("expand", "permissions")]).unwrap(),
            "/me/drive/root:/100%25/my%20notes.txt?expand=permissions"
        );
        assert_eq!(
            build("a#b", Action::Named("children"), &[]).unwrap(),
            "/me/drive/root:/a%23b:/children"
        );
        assert_eq!(
            build("my docs", Action::Reference, &[]).unwrap(),
            "/me/drive/root:/my%20docs"
        );
    }

    #[test]
    fn test_reserved_characters_rejected() {
        for character in RESERVED_CHARS {
            let path = format!("dir/file{}name", character);
            match build(&path, Action::Item, &[]) {
                Err(OneDriveError::InvalidPath { character: c, .. }) => assert_eq!(c, character),
                other => panic!("expected InvalidPath for {:?}, got {:?}", character, other),
            }
        }
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(parent_path("a/b/c.txt"), "/a/b");
        assert_eq!(parent_path("c.txt"), "/");
        assert_eq!(parent_path("/"), "/");
        assert_eq!(file_name("a/b/c.txt"), "c.txt");
        assert_eq!(file_name(""), "");
        assert!(is_root("./"));
        assert!(!is_root("a"));
    }
}
