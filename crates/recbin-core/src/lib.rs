//! Deleted-item recovery from Windows recycle bins.
//!
//! Pairs `$I` index records with their `$R` content, decodes where each item
//! came from and when it was deleted, keeps the items that lived under a
//! tracked sync-client account and hashes what can still be read.

pub mod accounts;
pub mod assemble;
pub mod correlate;
pub mod error;
pub mod format;
pub mod hash;
pub mod progress;
pub mod record;
pub mod scan;

pub use accounts::{AccountBucket, AccountRoot, AccountsConfig};
pub use assemble::{DeletedItems, OutputRecord, DELETED_FILE_TYPE};
pub use correlate::{correlate, TrashGroup, CONTENT_MARKER, INDEX_MARKER};
pub use error::{RecbinError, Result};
pub use hash::{hash_file, DigestPair, HashAlgorithm};
pub use progress::{ProgressCounter, ProgressMode, ProgressSink, TextProgress};
pub use record::{IndexRecord, RecordFormat};
pub use scan::{find_deleted, ScanIter, TrashScanner};
