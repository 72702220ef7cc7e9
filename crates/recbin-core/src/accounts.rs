//! Tracked account roots and path matching.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RecbinError, Result};

/// Separator used in original paths recorded by Windows
pub const PATH_SEPARATOR: char = '\\';

/// A folder name under which a sync client keeps an account's files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountRoot(pub String);

impl AccountRoot {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// `name\` must appear in the path, so `Docs` never matches `DocsArchive\`
    pub fn matches(&self, original_path: &str) -> bool {
        if self.0.is_empty() {
            return false;
        }

        let needle = format!("{}{}", self.0, PATH_SEPARATOR);
        original_path.contains(&needle)
    }
}

/// Named group of account roots, e.g. `Personal` or `Business1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBucket {
    pub name: String,
    #[serde(default)]
    pub roots: Vec<AccountRoot>,
}

impl AccountBucket {
    pub fn new(name: impl Into<String>, roots: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            roots: roots.into_iter().map(AccountRoot::new).collect(),
        }
    }

    pub fn matches(&self, original_path: &str) -> bool {
        self.roots.iter().any(|root| root.matches(original_path))
    }
}

/// Every tracked account, in tie-break order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsConfig {
    #[serde(default)]
    pub accounts: Vec<AccountBucket>,
}

impl AccountsConfig {
    pub fn new(accounts: Vec<AccountBucket>) -> Self {
        Self { accounts }
    }

    /// Load buckets from a JSON file of the form
    /// `{"accounts": [{"name": "Personal", "roots": ["OneDrive"]}]}`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a `NAME=ROOT` pair, as given on the command line
    pub fn parse_pair(pair: &str) -> Result<(String, String)> {
        match pair.split_once('=') {
            Some((name, root)) if !name.trim().is_empty() && !root.trim().is_empty() => {
                Ok((name.trim().to_string(), root.trim().to_string()))
            }
            _ => Err(RecbinError::Config(format!(
                "expected NAME=ROOT, got '{}'",
                pair
            ))),
        }
    }

    /// Add a root to the named bucket, creating the bucket at the end if needed
    pub fn add_root(&mut self, bucket: &str, root: &str) {
        match self.accounts.iter_mut().find(|b| b.name == bucket) {
            Some(existing) => existing.roots.push(AccountRoot::new(root)),
            None => self.accounts.push(AccountBucket::new(bucket, [root])),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for bucket in &self.accounts {
            if bucket.name.trim().is_empty() {
                return Err(RecbinError::Config("account bucket with empty name".to_string()));
            }
            if bucket.roots.iter().any(|root| root.name().is_empty()) {
                return Err(RecbinError::Config(format!(
                    "account bucket '{}' has an empty root",
                    bucket.name
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.iter().all(|bucket| bucket.roots.is_empty())
    }

    /// First bucket with a root inside `original_path`
    pub fn match_path(&self, original_path: &str) -> Option<&AccountBucket> {
        self.accounts
            .iter()
            .find(|bucket| bucket.matches(original_path))
    }
}
