use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::{DirEntry, WalkDir};

use crate::host::NamespaceIndex;

pub const PAGE_EXTENSION: &str = "txt";

/// Page store laid out as one directory per namespace and one `<name>.txt`
/// file per page.
#[derive(Debug, Clone)]
pub struct FilesystemIndex {
    pages_dir: PathBuf,
}

impl FilesystemIndex {
    pub fn new(pages_dir: impl Into<PathBuf>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
        }
    }

    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    pub fn namespace_dir(&self, namespace: &str) -> PathBuf {
        let mut path = self.pages_dir.clone();
        for segment in namespace.split(':').filter(|segment| !segment.is_empty()) {
            path.push(encode_segment(segment));
        }
        path
    }

    pub fn page_path(&self, id: &str) -> PathBuf {
        let (namespace, name) = match id.rsplit_once(':') {
            Some((namespace, name)) => (namespace, name),
            None => ("", id),
        };
        self.namespace_dir(namespace)
            .join(format!("{}.{PAGE_EXTENSION}", encode_segment(name)))
    }

    /// Raw markup of a page, `None` when the page does not exist.
    pub fn read_page(&self, id: &str) -> Result<Option<String>> {
        let path = self.page_path(id);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", display_path(&path)))?;
        Ok(Some(content))
    }
}

impl NamespaceIndex for FilesystemIndex {
    fn namespaces(&self, root: &str) -> Result<Vec<String>> {
        let base = self.namespace_dir(root);
        if !base.is_dir() {
            tracing::debug!(root, base = %display_path(&base), "namespace root missing");
            return Ok(Vec::new());
        }

        let root = root.trim_matches(':');
        let mut namespaces = Vec::new();
        let walker = WalkDir::new(&base)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));
        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk {}", display_path(&base)))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&base)
                .with_context(|| format!("{} is outside {}", entry.path().display(), base.display()))?;
            let mut segments: Vec<String> = Vec::new();
            if !root.is_empty() {
                segments.push(root.to_string());
            }
            for component in relative.components() {
                segments.push(decode_segment(&component.as_os_str().to_string_lossy()));
            }
            namespaces.push(segments.join(":"));
        }

        namespaces.sort_by(|left, right| compare_depth_first(left, right));
        Ok(namespaces)
    }
}

/// Orders namespace IDs so that every namespace directly precedes its own
/// descendants.
pub fn compare_depth_first(left: &str, right: &str) -> Ordering {
    left.split(':').cmp(right.split(':'))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

pub fn decode_segment(name: &str) -> String {
    match urlencoding::decode(name) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => name.to_string(),
    }
}

pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

fn display_path(path: &Path) -> String {
    normalize_separators(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{FilesystemIndex, compare_depth_first, decode_segment, encode_segment};
    use crate::host::NamespaceIndex;

    fn fixture() -> (tempfile::TempDir, FilesystemIndex) {
        let temp = tempdir().expect("tempdir");
        let pages = temp.path().join("pages");
        for dir in [
            "wiki",
            "wiki/syntax",
            "projects/alpha/notes",
            "projects/beta",
            "projects-old",
            "caf%C3%A9",
            ".git/objects",
        ] {
            fs::create_dir_all(pages.join(dir)).expect("create namespace dir");
        }
        fs::write(pages.join("start.txt"), "Welcome {{NEWPAGE}}").expect("write page");
        fs::write(pages.join("projects").join("start.txt"), "Projects").expect("write page");
        let index = FilesystemIndex::new(pages);
        (temp, index)
    }

    #[test]
    fn lists_all_namespaces_depth_first() {
        let (_temp, index) = fixture();
        let namespaces = index.namespaces("").expect("list namespaces");
        assert_eq!(
            namespaces,
            vec![
                "café",
                "projects",
                "projects:alpha",
                "projects:alpha:notes",
                "projects:beta",
                "projects-old",
                "wiki",
                "wiki:syntax",
            ]
        );
    }

    #[test]
    fn lists_namespaces_below_root_only() {
        let (_temp, index) = fixture();
        let namespaces = index.namespaces("projects").expect("list namespaces");
        assert_eq!(
            namespaces,
            vec!["projects:alpha", "projects:alpha:notes", "projects:beta"]
        );
    }

    #[test]
    fn missing_root_yields_nothing() {
        let (_temp, index) = fixture();
        assert!(index.namespaces("nowhere").expect("list").is_empty());
    }

    #[test]
    fn reads_pages_by_id() {
        let (_temp, index) = fixture();
        assert_eq!(
            index.read_page("start").expect("read").as_deref(),
            Some("Welcome {{NEWPAGE}}")
        );
        assert_eq!(
            index.read_page("projects:start").expect("read").as_deref(),
            Some("Projects")
        );
        assert!(index.read_page("projects:missing").expect("read").is_none());
    }

    #[test]
    fn page_path_encodes_segments() {
        let index = FilesystemIndex::new("/data/pages");
        let path = index.page_path("café:menu");
        assert!(path.ends_with("caf%C3%A9/menu.txt"));
    }

    #[test]
    fn segment_encoding_round_trips_non_ascii() {
        assert_eq!(encode_segment("café"), "caf%C3%A9");
        assert_eq!(decode_segment("caf%C3%A9"), "café");
        assert_eq!(decode_segment("plain_name"), "plain_name");
    }

    #[test]
    fn depth_first_order_keeps_children_with_parent() {
        let mut ids = vec!["a-b", "a:b", "a", "a:b:c", "b"];
        ids.sort_by(|left, right| compare_depth_first(left, right));
        assert_eq!(ids, vec!["a", "a:b", "a:b:c", "a-b", "b"]);
    }
}
