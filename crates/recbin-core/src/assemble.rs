//! Output records for deleted items
//!
//! Turns correlated trash groups into the records the explorer's tree view
//! consumes. Records are produced lazily, one content file at a time, so a
//! caller can stop consuming at any point.

use std::path::{Component, Path};
use std::vec;

use serde::{Deserialize, Serialize};

use crate::accounts::{AccountsConfig, PATH_SEPARATOR};
use crate::correlate::TrashGroup;
use crate::format;
use crate::hash::{self, HashAlgorithm};
use crate::progress::{ProgressSink, SCAN_STATUS};
use crate::record::IndexRecord;

/// `Type` of every record recovered from the recycle bin
pub const DELETED_FILE_TYPE: &str = "File - deleted";

/// A deleted item as shown in the drive tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputRecord {
    pub parent_id: String,
    pub drive_item_id: String,
    #[serde(rename = "eTag")]
    pub e_tag: String,
    #[serde(rename = "Type")]
    pub item_type: String,
    pub name: String,
    /// e.g. `5 KB`
    pub size: String,
    /// Algorithm-tagged digest, empty if the content was unreadable
    pub hash: String,
    pub path: String,
    pub delete_time_stamp: String,
    pub children: Vec<OutputRecord>,
    pub level: String,
}

impl OutputRecord {
    /// Deleted-file record with the tree fields left empty
    pub fn deleted(
        name: impl Into<String>,
        size: impl Into<String>,
        hash: impl Into<String>,
        path: impl Into<String>,
        delete_time_stamp: impl Into<String>,
    ) -> Self {
        Self {
            parent_id: String::new(),
            drive_item_id: String::new(),
            e_tag: String::new(),
            item_type: DELETED_FILE_TYPE.to_string(),
            name: name.into(),
            size: size.into(),
            hash: hash.into(),
            path: path.into(),
            delete_time_stamp: delete_time_stamp.into(),
            children: Vec::new(),
            level: String::new(),
        }
    }
}

/// Append each directory of `relative` to `base` using `\`
fn join_original_path(base: &str, relative: &Path) -> String {
    let mut joined = base.to_string();

    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            if let Component::Normal(part) = component {
                joined.push(PATH_SEPARATOR);
                joined.push_str(&part.to_string_lossy());
            }
        }
    }

    joined
}

/// Record for a stand-alone deleted file, hashed over `$R<id>`
pub fn assemble_file(
    group: &TrashGroup,
    record: &IndexRecord,
    algorithm: HashAlgorithm,
) -> OutputRecord {
    let digests = hash::hash_file(group.content_path());

    OutputRecord::deleted(
        record.name(),
        record.size_display(),
        digests.tagged(algorithm),
        record.parent_path(),
        record.delete_time_display(),
    )
}

/// Record for one file nested inside a deleted folder
pub fn assemble_nested(
    group: &TrashGroup,
    record: &IndexRecord,
    relative: &Path,
    algorithm: HashAlgorithm,
) -> OutputRecord {
    let content_path = group.content_entry_path(relative);
    let digests = hash::hash_file(&content_path);

    let size = match std::fs::metadata(&content_path) {
        Ok(metadata) => format::format_size_kb_plain(metadata.len()),
        Err(e) => {
            tracing::warn!(
                "Cannot stat {}, using recorded size: {}",
                content_path.display(),
                e
            );
            record.size_display()
        }
    };

    let name = relative
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    OutputRecord::deleted(
        name,
        size,
        digests.tagged(algorithm),
        join_original_path(&record.original_path, relative),
        record.delete_time_display(),
    )
}

/// A decoded group that matched a tracked account
struct PendingGroup {
    group: TrashGroup,
    record: IndexRecord,
    algorithm: HashAlgorithm,
    emitted: usize,
}

impl PendingGroup {
    fn next_record(&mut self) -> Option<OutputRecord> {
        let output = if self.group.is_folder() {
            let relative = self.group.content.get(self.emitted)?;
            assemble_nested(&self.group, &self.record, relative, self.algorithm)
        } else if self.emitted == 0 {
            assemble_file(&self.group, &self.record, self.algorithm)
        } else {
            return None;
        };

        self.emitted += 1;
        Some(output)
    }
}

/// Decode a group and pick its digest algorithm, or `None` to skip it
fn prepare(group: TrashGroup, accounts: &AccountsConfig) -> Option<PendingGroup> {
    let record = match IndexRecord::read_from(&group.index_path) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Skipping {}: {}", group.index_path.display(), e);
            return None;
        }
    };

    let bucket = accounts.match_path(&record.original_path)?;
    tracing::debug!(
        "{} belongs to account bucket {}",
        record.original_path,
        bucket.name
    );

    Some(PendingGroup {
        algorithm: HashAlgorithm::for_bucket(&bucket.name),
        group,
        record,
        emitted: 0,
    })
}

/// Lazy sequence of [`OutputRecord`]s for a set of trash groups
pub struct DeletedItems {
    groups: vec::IntoIter<TrashGroup>,
    accounts: AccountsConfig,
    current: Option<PendingGroup>,
    progress: Option<Box<dyn ProgressSink>>,
    processed: usize,
    total: usize,
    finished: bool,
}

impl DeletedItems {
    pub fn new(
        groups: Vec<TrashGroup>,
        accounts: AccountsConfig,
        progress: Option<Box<dyn ProgressSink>>,
    ) -> Self {
        Self {
            total: groups.len(),
            groups: groups.into_iter(),
            accounts,
            current: None,
            progress,
            processed: 0,
            finished: false,
        }
    }

    /// Number of trash groups in the scan
    pub fn total(&self) -> usize {
        self.total
    }

    /// Groups fully processed so far
    pub fn processed(&self) -> usize {
        self.processed
    }

    fn group_done(&mut self) {
        self.processed += 1;
        if let Some(progress) = self.progress.as_mut() {
            progress.report(self.processed, self.total, SCAN_STATUS);
        }
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            if let Some(progress) = self.progress.as_mut() {
                progress.finish();
            }
        }
    }
}

impl Iterator for DeletedItems {
    type Item = OutputRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pending) = self.current.as_mut() {
                if let Some(output) = pending.next_record() {
                    return Some(output);
                }
                self.current = None;
                self.group_done();
                continue;
            }

            let Some(group) = self.groups.next() else {
                self.finish();
                return None;
            };

            match prepare(group, &self.accounts) {
                Some(pending) => self.current = Some(pending),
                None => self.group_done(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountBucket;
    use crate::record::RecordFormat;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn write_index(dir: &Path, id: &str, original_path: &str, size: u64) -> TrashGroup {
        let record = IndexRecord {
            format: RecordFormat::Current,
            size_bytes: size,
            delete_timestamp_raw: 13_281_793_500_000_000,
            original_path: original_path.to_string(),
        };
        let index_path = dir.join(format!("$I{}", id));
        fs::write(&index_path, record.to_bytes()).unwrap();
        TrashGroup::new(index_path, id)
    }

    fn accounts(name: &str, root: &str) -> AccountsConfig {
        AccountsConfig::new(vec![AccountBucket::new(name, [root])])
    }

    #[test]
    fn test_output_record_field_names() {
        let record = OutputRecord::deleted("a.txt", "1 KB", "", "C:\\x", EPOCH);
        let json = serde_json::to_value(&record).unwrap();

        for key in [
            "ParentId",
            "DriveItemId",
            "eTag",
            "Type",
            "Name",
            "Size",
            "Hash",
            "Path",
            "DeleteTimeStamp",
            "Children",
            "Level",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["Type"], DELETED_FILE_TYPE);
        assert_eq!(json["Children"], serde_json::json!([]));
    }

    const EPOCH: &str = crate::format::EPOCH_DISPLAY;

    #[test]
    fn test_join_original_path() {
        assert_eq!(join_original_path("C:\\D", Path::new("a.txt")), "C:\\D");
        assert_eq!(
            join_original_path("C:\\D", &PathBuf::from("x").join("y").join("a.txt")),
            "C:\\D\\x\\y"
        );
    }

    #[test]
    fn test_single_file_group() {
        let temp_dir = TempDir::new().unwrap();
        let group = write_index(temp_dir.path(), "AAA.txt", "C:\\Users\\A\\OneDrive\\a.txt", 10);
        fs::write(group.content_path(), b"").unwrap();

        let items: Vec<_> =
            DeletedItems::new(vec![group], accounts("Personal", "OneDrive"), None).collect();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "a.txt");
        assert_eq!(items[0].path, "C:\\Users\\A\\OneDrive");
        assert_eq!(items[0].size, "1 KB");
        assert_eq!(items[0].hash, "SHA1(da39a3ee5e6b4b0d3255bfef95601890afd80709)");
        assert_eq!(items[0].delete_time_stamp, "2021-11-19 11:05:00");
    }

    #[test]
    fn test_folder_group_uses_content_sizes() {
        let temp_dir = TempDir::new().unwrap();
        let mut group = write_index(temp_dir.path(), "BBB", "C:\\Users\\A\\Work\\Reports", 0);
        let content_dir = group.content_path();
        fs::create_dir_all(content_dir.join("q1")).unwrap();
        fs::write(content_dir.join("top.txt"), vec![0u8; 2048]).unwrap();
        fs::write(content_dir.join("q1").join("jan.txt"), b"hello world").unwrap();
        group.content = vec![PathBuf::from("q1").join("jan.txt"), PathBuf::from("top.txt")];

        let items: Vec<_> =
            DeletedItems::new(vec![group], accounts("Business1", "Work"), None).collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "jan.txt");
        assert_eq!(items[0].path, "C:\\Users\\A\\Work\\Reports\\q1");
        assert_eq!(items[0].hash, "quickXor(aCgDG9jwBhDc4Q1yawMZAAAAAAA=)");
        assert_eq!(items[1].name, "top.txt");
        assert_eq!(items[1].path, "C:\\Users\\A\\Work\\Reports");
        assert_eq!(items[1].size, "3 KB");
    }

    #[test]
    fn test_nested_size_has_no_separators() {
        let temp_dir = TempDir::new().unwrap();
        let mut group = write_index(temp_dir.path(), "EEE", "C:\\Work\\Big", 0);
        let content_dir = group.content_path();
        fs::create_dir_all(&content_dir).unwrap();
        fs::write(content_dir.join("big.bin"), vec![0u8; 1024 * 1024]).unwrap();
        group.content = vec![PathBuf::from("big.bin")];

        let items: Vec<_> =
            DeletedItems::new(vec![group], accounts("Business1", "Work"), None).collect();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].size, "1025 KB");
    }

    #[test]
    fn test_missing_nested_file_keeps_recorded_size() {
        let temp_dir = TempDir::new().unwrap();
        let mut group = write_index(temp_dir.path(), "CCC", "C:\\Work\\Gone", 4096);
        group.content = vec![PathBuf::from("vanished.txt")];

        let items: Vec<_> =
            DeletedItems::new(vec![group], accounts("Business1", "Work"), None).collect();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].size, "5 KB");
        assert_eq!(items[0].hash, "");
    }

    #[test]
    fn test_unmatched_and_malformed_groups_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let unmatched = write_index(temp_dir.path(), "DDD", "C:\\Users\\A\\Desktop\\x.txt", 1);
        let malformed_path = temp_dir.path().join("$IEEE");
        fs::write(&malformed_path, [2u8, 0, 0]).unwrap();
        let malformed = TrashGroup::new(malformed_path, "EEE");

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink_reports = Arc::clone(&reports);
        let sink = move |count: usize, total: usize, _: &str| {
            sink_reports.lock().unwrap().push((count, total));
        };

        let items: Vec<_> = DeletedItems::new(
            vec![unmatched, malformed],
            accounts("Personal", "OneDrive"),
            Some(Box::new(sink)),
        )
        .collect();

        assert!(items.is_empty());
        assert_eq!(*reports.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn test_iteration_is_lazy() {
        let temp_dir = TempDir::new().unwrap();
        let mut groups = Vec::new();
        for id in ["A1", "A2", "A3"] {
            let group = write_index(
                temp_dir.path(),
                id,
                &format!("C:\\OneDrive\\{}.txt", id),
                1,
            );
            fs::write(group.content_path(), id).unwrap();
            groups.push(group);
        }

        let mut items = DeletedItems::new(groups, accounts("Personal", "OneDrive"), None);
        assert_eq!(items.total(), 3);

        let first = items.next().unwrap();
        assert_eq!(first.name, "A1.txt");
        assert_eq!(items.processed(), 0);

        items.next().unwrap();
        assert_eq!(items.processed(), 1);
    }
}
