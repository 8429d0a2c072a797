//! Registry collaborator ports and their adapters.
//!
//! The decision engine consumes three capabilities: a trusted-foundation
//! lookup, a blacklist lookup, and an append-only audit log. They are
//! injected as traits; [`InMemoryRegistry`] is the fixture/test store and
//! [`FileRegistry`] the persistent adapter, selected by configuration.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{TruadboonError, TruadboonResult};
use crate::identifier::normalize;
use crate::verify::VerificationStatus;

/// A charitable foundation in the trust registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Foundation {
    pub name: String,
    #[serde(default)]
    pub account_name: Option<String>,
    pub account_number: String,
    pub bank: String,
    pub category: String,
    pub verified: bool,
}

/// An account reported as fraudulent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub account_number: String,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reported_by: Option<String>,
}

/// One audit record per verification resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub account_number: String,
    pub status: VerificationStatus,
    pub source: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

pub trait FoundationLookup {
    fn find_foundation(&self, account_number: &str) -> TruadboonResult<Option<Foundation>>;
}

pub trait BlacklistLookup {
    fn find_blacklisted(&self, account_number: &str) -> TruadboonResult<Option<BlacklistEntry>>;
}

pub trait AuditLog {
    fn append(&self, entry: AuditEntry) -> TruadboonResult<()>;
}

/// Stored account formatting is inconsistent (dashes, spaces); an exact
/// probe is tried first, then a normalized comparison.
fn account_matches(stored: &str, query: &str, normalized_query: &str) -> bool {
    stored == query || normalize(stored) == normalized_query
}

/// In-memory registry over plain vectors.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    foundations: Vec<Foundation>,
    blacklist: Vec<BlacklistEntry>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(foundations: Vec<Foundation>, blacklist: Vec<BlacklistEntry>) -> Self {
        Self {
            foundations,
            blacklist,
            audit: Mutex::new(Vec::new()),
        }
    }

    /// Registry preloaded with the bundled verification fixtures.
    pub fn seeded() -> Self {
        let foundations = vec![
            Foundation {
                name: "Songklanagarind for Disaster Relief (ม.อ. หาดใหญ่)".to_owned(),
                account_name: None,
                account_number: "565-471106-1".to_owned(),
                bank: "Siam Commercial Bank (SCB)".to_owned(),
                category: "Disaster Relief".to_owned(),
                verified: true,
            },
            Foundation {
                name: "Thai Red Cross Society for Disaster".to_owned(),
                account_name: None,
                account_number: "045-3-04637-0".to_owned(),
                bank: "Siam Commercial Bank (SCB)".to_owned(),
                category: "Disaster Relief".to_owned(),
                verified: true,
            },
            Foundation {
                name: "Mirror Foundation (มูลนิธิกระจกเงา)".to_owned(),
                account_name: None,
                account_number: "507-4-10183-8".to_owned(),
                bank: "Siam Commercial Bank (SCB)".to_owned(),
                category: "Medical".to_owned(),
                verified: true,
            },
            Foundation {
                name: "Doing Good Foundation (มูลนิธิธรรมดีทำดี)".to_owned(),
                account_name: None,
                account_number: "713-2-59590-3".to_owned(),
                bank: "Kasikorn Bank (KBank)".to_owned(),
                category: "Education".to_owned(),
                verified: true,
            },
            Foundation {
                name: "Hat Yai City Climate (Southern Network)".to_owned(),
                account_name: None,
                account_number: "018-1-23504-7".to_owned(),
                bank: "Kasikorn Bank (KBank)".to_owned(),
                category: "Environment".to_owned(),
                verified: true,
            },
        ];
        let blacklist = vec![
            BlacklistEntry {
                account_number: "0999999999".to_owned(),
                bank: None,
                reason: Some("Fake charity scam - impersonating Red Cross".to_owned()),
                reported_by: Some("user@example.com".to_owned()),
            },
            BlacklistEntry {
                account_number: "0888888888".to_owned(),
                bank: None,
                reason: Some("Ponzi scheme disguised as disaster relief".to_owned()),
                reported_by: Some("admin@truadboon.com".to_owned()),
            },
            BlacklistEntry {
                account_number: "0777777777".to_owned(),
                bank: None,
                reason: Some("Money laundering operation".to_owned()),
                reported_by: Some("user@example.com".to_owned()),
            },
        ];
        Self::with_entries(foundations, blacklist)
    }

    pub fn add_foundation(&mut self, foundation: Foundation) {
        self.foundations.push(foundation);
    }

    pub fn add_blacklisted(&mut self, entry: BlacklistEntry) {
        self.blacklist.push(entry);
    }

    pub fn foundations(&self) -> &[Foundation] {
        &self.foundations
    }

    /// Snapshot of everything appended so far.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl FoundationLookup for InMemoryRegistry {
    fn find_foundation(&self, account_number: &str) -> TruadboonResult<Option<Foundation>> {
        let normalized = normalize(account_number);
        Ok(self
            .foundations
            .iter()
            .find(|f| account_matches(&f.account_number, account_number, &normalized))
            .cloned())
    }
}

impl BlacklistLookup for InMemoryRegistry {
    fn find_blacklisted(&self, account_number: &str) -> TruadboonResult<Option<BlacklistEntry>> {
        let normalized = normalize(account_number);
        Ok(self
            .blacklist
            .iter()
            .find(|b| account_matches(&b.account_number, account_number, &normalized))
            .cloned())
    }
}

impl AuditLog for InMemoryRegistry {
    fn append(&self, entry: AuditEntry) -> TruadboonResult<()> {
        let mut entries = self
            .audit
            .lock()
            .map_err(|_| TruadboonError::AuditLog("audit log mutex poisoned".to_owned()))?;
        entries.push(entry);
        Ok(())
    }
}

/// File-backed registry adapter.
///
/// `foundations.json` and `blacklist.json` are loaded once when the
/// registry is opened (a missing file reads as empty); audit entries are
/// appended as JSON lines to `audit.log`.
#[derive(Debug)]
pub struct FileRegistry {
    store: InMemoryRegistry,
    audit_path: PathBuf,
}

impl FileRegistry {
    pub fn open(dir: impl AsRef<Path>) -> TruadboonResult<Self> {
        let dir = dir.as_ref();
        let foundations = read_json_entries(&dir.join("foundations.json"))?;
        let blacklist = read_json_entries(&dir.join("blacklist.json"))?;
        Ok(Self {
            store: InMemoryRegistry::with_entries(foundations, blacklist),
            audit_path: dir.join("audit.log"),
        })
    }

    pub fn foundations(&self) -> &[Foundation] {
        self.store.foundations()
    }
}

fn read_json_entries<T: DeserializeOwned>(path: &Path) -> TruadboonResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

impl FoundationLookup for FileRegistry {
    fn find_foundation(&self, account_number: &str) -> TruadboonResult<Option<Foundation>> {
        self.store.find_foundation(account_number)
    }
}

impl BlacklistLookup for FileRegistry {
    fn find_blacklisted(&self, account_number: &str) -> TruadboonResult<Option<BlacklistEntry>> {
        self.store.find_blacklisted(account_number)
    }
}

impl AuditLog for FileRegistry {
    fn append(&self, entry: AuditEntry) -> TruadboonResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        Ok(())
    }
}
