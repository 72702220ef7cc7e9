//! Pairing of `$I` index records with their `$R` content
//!
//! A deleted file leaves `$I<id>` and `$R<id>` side by side. A deleted
//! folder leaves `$I<id>` and a `$R<id>` directory, whose nested files are
//! reported individually. A `$R...` directory without a sibling index
//! record (`$Recycle.Bin` itself, for one) is an ordinary directory.
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;

/// File name prefix of index records
pub const INDEX_MARKER: &str = "$I";

/// File name prefix of recovered content
pub const CONTENT_MARKER: &str = "$R";

/// One deleted item: its index record and any nested content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashGroup {
    /// Path of the `$I<id>` file
    pub index_path: PathBuf,
    /// Text following the marker, shared by `$I<id>` and `$R<id>`
    pub deletion_id: String,
    /// Files below the `$R<id>` directory, relative to it
    pub content: Vec<PathBuf>,
}

impl TrashGroup {
    pub fn new(index_path: PathBuf, deletion_id: impl Into<String>) -> Self {
        Self {
            index_path,
            deletion_id: deletion_id.into(),
            content: Vec::new(),
        }
    }

    /// `$R<id>` next to the index record
    pub fn content_path(&self) -> PathBuf {
        self.index_path
            .with_file_name(format!("{}{}", CONTENT_MARKER, self.deletion_id))
    }

    /// A nested file inside a deleted folder
    pub fn content_entry_path(&self, relative: &Path) -> PathBuf {
        self.content_path().join(relative)
    }

    /// Deleted folders carry their nested files
    pub fn is_folder(&self) -> bool {
        !self.content.is_empty()
    }
}

/// Deletion id from a marker-prefixed file name
pub fn deletion_id<'a>(file_name: &'a str, marker: &str) -> Option<&'a str> {
    file_name
        .strip_prefix(marker)
        .filter(|id| !id.is_empty())
}

/// Locate the deleted folder enclosing `path`: the outermost `$R<id>`
/// directory below `root` whose sibling `$I<id>` is a known index record.
/// Returns that index path and the remainder beneath the folder.
fn enclosing_deleted_folder(
    root: &Path,
    path: &Path,
    index_paths: &HashSet<PathBuf>,
) -> Option<(PathBuf, PathBuf)> {
    let relative = path.strip_prefix(root).ok()?;
    let components: Vec<_> = relative.components().collect();
    let mut parent = root.to_path_buf();

    for (i, component) in components.iter().enumerate() {
        if i + 1 == components.len() {
            break;
        }
        let name = component.as_os_str().to_string_lossy();
        if let Some(id) = deletion_id(&name, CONTENT_MARKER) {
            let index_path = parent.join(format!("{}{}", INDEX_MARKER, id));
            if index_paths.contains(&index_path) {
                let remainder: PathBuf = components[i + 1..].iter().collect();
                return Some((index_path, remainder));
            }
        }
        parent.push(component);
    }

    None
}

/// Walk `root` once and build every trash group, sorted by index path
pub fn correlate(root: &Path) -> Result<Vec<TrashGroup>> {
    let metadata = std::fs::metadata(root)?;
    if !metadata.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not a directory", root.display()),
        )
        .into());
    }

    let mut files = Vec::new();
    let mut index_paths = HashSet::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Skipping unreadable trash entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        let is_index = path
            .file_name()
            .map(|name| deletion_id(&name.to_string_lossy(), INDEX_MARKER).is_some())
            .unwrap_or(false);
        if is_index {
            index_paths.insert(path.clone());
        }
        files.push(path);
    }

    // Folders can only be told apart from plain directories once every
    // index record is known
    let mut groups: HashMap<String, TrashGroup> = HashMap::new();
    let mut nested: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();

    for path in files {
        if let Some((index_path, relative)) = enclosing_deleted_folder(root, &path, &index_paths) {
            tracing::debug!("Nested content {} for {}", relative.display(), index_path.display());
            nested.entry(index_path).or_default().push(relative);
            continue;
        }

        if !index_paths.contains(&path) {
            tracing::debug!("Ignoring {}", path.display());
            continue;
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(id) = deletion_id(&name, INDEX_MARKER) {
            match groups.get(id) {
                Some(existing) => tracing::warn!(
                    "Duplicate deletion id {} at {} (keeping {})",
                    id,
                    path.display(),
                    existing.index_path.display()
                ),
                None => {
                    groups.insert(id.to_string(), TrashGroup::new(path.clone(), id));
                }
            }
        }
    }

    let mut groups: Vec<TrashGroup> = groups.into_values().collect();
    for group in &mut groups {
        if let Some(mut content) = nested.remove(&group.index_path) {
            content.sort();
            group.content = content;
        }
    }
    for (index_path, content) in nested {
        tracing::debug!(
            "Dropping {} nested files of {} (duplicate deletion id)",
            content.len(),
            index_path.display()
        );
    }
    groups.sort_by(|a, b| a.index_path.cmp(&b.index_path));

    tracing::debug!("Correlated {} trash groups under {}", groups.len(), root.display());

    Ok(groups)
}
