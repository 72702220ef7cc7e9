//! Content hashing for recovered `$R` files
//!
//! Both digests OneDrive reports are computed in a single streaming pass so
//! the caller can surface whichever one matches the owning account.
pub mod quickxor;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{RecbinError, Result};

pub use quickxor::QuickXorHash;

const BUF_SIZE: usize = 64 * 1024;

/// Account bucket whose items are reported with SHA-1
pub const SHA1_BUCKET: &str = "Personal";

/// Digest algorithms available for recovered content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    QuickXor,
}

impl HashAlgorithm {
    /// Algorithm OneDrive uses for items of the given account bucket
    pub fn for_bucket(bucket: &str) -> Self {
        if bucket == SHA1_BUCKET {
            Self::Sha1
        } else {
            Self::QuickXor
        }
    }

    /// Tag prefixed to digests of this algorithm
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::QuickXor => "quickXor",
        }
    }
}

/// SHA-1 and QuickXor digests of one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestPair {
    /// Lowercase hex
    pub sha1_hex: String,
    /// Base64 of the 20-byte QuickXorHash
    pub quick_xor_base64: String,
}

impl DigestPair {
    /// True when the content could not be read
    pub fn is_empty(&self) -> bool {
        self.sha1_hex.is_empty() && self.quick_xor_base64.is_empty()
    }

    pub fn get(&self, algorithm: HashAlgorithm) -> &str {
        match algorithm {
            HashAlgorithm::Sha1 => &self.sha1_hex,
            HashAlgorithm::QuickXor => &self.quick_xor_base64,
        }
    }

    /// Digest wrapped in its algorithm tag, e.g. `SHA1(da39...)`.
    /// Empty when the content was unreadable.
    pub fn tagged(&self, algorithm: HashAlgorithm) -> String {
        let value = self.get(algorithm);
        if value.is_empty() {
            String::new()
        } else {
            format!("{}({})", algorithm.tag(), value)
        }
    }
}

/// Stream a reader through both digests
pub fn digest_reader(mut reader: impl Read) -> std::io::Result<DigestPair> {
    let mut sha1 = Sha1::new();
    let mut quick_xor = QuickXorHash::new();
    let mut buffer = vec![0; BUF_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        sha1.update(&buffer[..n]);
        quick_xor.update(&buffer[..n]);
    }

    Ok(DigestPair {
        sha1_hex: format!("{:x}", sha1.finalize()),
        quick_xor_base64: BASE64.encode(quick_xor.finalize()),
    })
}

/// Hash a file, reporting open and read failures
pub fn try_hash_file(path: impl AsRef<Path>) -> Result<DigestPair> {
    let path = path.as_ref();
    let unreadable = |source| RecbinError::UnreadableContent {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(unreadable)?;
    digest_reader(file).map_err(unreadable)
}

/// Hash a file, yielding an empty pair if it cannot be read
pub fn hash_file(path: impl AsRef<Path>) -> DigestPair {
    match try_hash_file(path) {
        Ok(digests) => digests,
        Err(e) => {
            tracing::warn!("{}", e);
            DigestPair::default()
        }
    }
}
