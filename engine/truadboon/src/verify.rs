//! Verification decision engine.
//!
//! One request resolves to exactly one of three verdicts: a blacklist
//! match is `danger` (highest precedence), a verified foundation match is
//! `safe`, and everything else is `warning`. Both registry lookups run
//! before the branch; every resolution attempts exactly one audit append.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::warn;

use crate::error::{TruadboonError, TruadboonResult};
use crate::identifier::normalize;
use crate::registry::{
    AuditEntry, AuditLog, BlacklistEntry, BlacklistLookup, Foundation, FoundationLookup,
};

/// Traffic-light verdict for a verification request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Safe,
    Warning,
    Danger,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Safe => "safe",
            VerificationStatus::Warning => "warning",
            VerificationStatus::Danger => "danger",
        }
    }
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which registry, if any, produced the verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchedType {
    Foundation,
    Blacklist,
    None,
}

impl MatchedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchedType::Foundation => "FOUNDATION",
            MatchedType::Blacklist => "BLACKLIST",
            MatchedType::None => "NONE",
        }
    }
}

/// Fixed verdict messages, in the registry's display language.
pub const SAFE_MESSAGE: &str =
    "บัญชีนี้เป็นมูลนิธิที่ได้รับการรับรอง ปลอดภัย 100% สามารถบริจาคได้อย่างมั่นใจ";
pub const WARNING_MESSAGE: &str =
    "ไม่พบข้อมูลบัญชีนี้ในระบบ กรุณาตรวจสอบอีกครั้งหรือติดต่อมูลนิธิโดยตรง";
pub const DANGER_MESSAGE: &str = "บัญชีนี้อยู่ในรายชื่อมิจฉาชีพ ห้ามโอนเงิน!";

const NAME_NOT_FOUND: &str = "ไม่พบข้อมูล";
const BLACKLISTED_NAME: &str = "บัญชีถูกรายงานว่าเป็นมิจฉาชีพ";
const BANK_UNSPECIFIED: &str = "ไม่ระบุ";

/// Thai display name for a stored bank code; free-form labels pass
/// through unchanged.
pub fn bank_display_name(bank: Option<&str>) -> String {
    let Some(bank) = bank.filter(|b| !b.is_empty()) else {
        return BANK_UNSPECIFIED.to_owned();
    };
    match bank {
        "PROMPTPAY" => "พร้อมเพย์",
        "KBANK" => "ธนาคารกสิกรไทย",
        "SCB" => "ธนาคารไทยพาณิชย์",
        "BBL" => "ธนาคารกรุงเทพ",
        "KTB" => "ธนาคารกรุงไทย",
        "BAY" => "ธนาคารกรุงศรีอยุธยา",
        "TMB" => "ธนาคารทหารไทยธนชาต",
        "CIMB" => "ธนาคารซีไอเอ็มบีไทย",
        "TISCO" => "ธนาคารทิสโก้",
        "UOB" => "ธนาคารยูโอบี",
        "GSB" => "ธนาคารออมสิน",
        "BAAC" => "ธนาคารเพื่อการเกษตรและสหกรณ์การเกษตร",
        "OTHER" => "อื่นๆ",
        other => other,
    }
    .to_owned()
}

/// Caller-supplied display hints accompanying a verification request.
#[derive(Clone, Debug)]
pub struct VerifyHints {
    /// Merchant/receiver name, typically from the decoded QR payload.
    pub account_name: Option<String>,
    pub bank: Option<String>,
    pub source: String,
    pub user_id: Option<String>,
}

impl Default for VerifyHints {
    fn default() -> Self {
        Self {
            account_name: None,
            bank: None,
            source: "WEB".to_owned(),
            user_id: None,
        }
    }
}

/// The verdict returned to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub account_name: String,
    pub account_number: String,
    pub bank: String,
    pub message: String,
    pub matched_type: MatchedType,
}

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Decision engine over injected registry ports.
pub struct Verifier {
    foundations: Arc<dyn FoundationLookup + Send + Sync>,
    blacklist: Arc<dyn BlacklistLookup + Send + Sync>,
    audit: Arc<dyn AuditLog + Send + Sync>,
    lookup_timeout: Duration,
}

impl Verifier {
    pub fn new(
        foundations: Arc<dyn FoundationLookup + Send + Sync>,
        blacklist: Arc<dyn BlacklistLookup + Send + Sync>,
        audit: Arc<dyn AuditLog + Send + Sync>,
    ) -> Self {
        Self {
            foundations,
            blacklist,
            audit,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Wire all three ports to one registry implementation.
    pub fn from_registry<R>(registry: Arc<R>) -> Self
    where
        R: FoundationLookup + BlacklistLookup + AuditLog + Send + Sync + 'static,
    {
        Self::new(registry.clone(), registry.clone(), registry)
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Resolve a verdict for one identifier.
    ///
    /// The identifier must normalize to something non-empty; lookup
    /// transport failures and timeouts fail the request. An audit append
    /// is attempted for every resolution and its failure never reaches
    /// the caller.
    pub fn verify(
        &self,
        account_number: &str,
        hints: &VerifyHints,
    ) -> TruadboonResult<VerificationResult> {
        let normalized = normalize(account_number);
        if normalized.is_empty() {
            return Err(TruadboonError::InvalidIdentifier);
        }

        // The two lookups are independent; issue both before waiting so
        // neither serializes behind the other.
        let blacklist_rx = spawn_lookup({
            let blacklist = Arc::clone(&self.blacklist);
            let key = normalized.clone();
            move || blacklist.find_blacklisted(&key)
        });
        let foundation_rx = spawn_lookup({
            let foundations = Arc::clone(&self.foundations);
            let key = normalized;
            move || foundations.find_foundation(&key)
        });

        let blacklist_match = recv_lookup(blacklist_rx, self.lookup_timeout)?;
        let foundation_match = recv_lookup(foundation_rx, self.lookup_timeout)?;

        let result = if let Some(entry) = blacklist_match {
            danger_result(entry, hints)
        } else if let Some(foundation) = foundation_match.filter(|f| f.verified) {
            safe_result(foundation)
        } else {
            warning_result(account_number, hints)
        };

        let entry = AuditEntry {
            account_number: result.account_number.clone(),
            status: result.status,
            source: hints.source.clone(),
            user_id: hints.user_id.clone(),
        };
        if let Err(err) = self.audit.append(entry) {
            warn!(error = %err, "audit log append failed");
        }

        Ok(result)
    }
}

fn spawn_lookup<T, F>(lookup: F) -> mpsc::Receiver<TruadboonResult<T>>
where
    T: Send + 'static,
    F: FnOnce() -> TruadboonResult<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(lookup());
    });
    rx
}

fn recv_lookup<T>(rx: mpsc::Receiver<TruadboonResult<T>>, timeout: Duration) -> TruadboonResult<T> {
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(TruadboonError::RegistryTimeout),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(TruadboonError::Registry("lookup worker disconnected".to_owned()))
        }
    }
}

fn danger_result(entry: BlacklistEntry, hints: &VerifyHints) -> VerificationResult {
    VerificationResult {
        status: VerificationStatus::Danger,
        account_name: BLACKLISTED_NAME.to_owned(),
        account_number: entry.account_number,
        bank: bank_display_name(entry.bank.as_deref().or(hints.bank.as_deref())),
        message: entry.reason.unwrap_or_else(|| DANGER_MESSAGE.to_owned()),
        matched_type: MatchedType::Blacklist,
    }
}

fn safe_result(foundation: Foundation) -> VerificationResult {
    VerificationResult {
        status: VerificationStatus::Safe,
        account_name: foundation
            .account_name
            .unwrap_or_else(|| foundation.name.clone()),
        account_number: foundation.account_number,
        bank: bank_display_name(Some(&foundation.bank)),
        message: SAFE_MESSAGE.to_owned(),
        matched_type: MatchedType::Foundation,
    }
}

fn warning_result(account_number: &str, hints: &VerifyHints) -> VerificationResult {
    VerificationResult {
        status: VerificationStatus::Warning,
        account_name: hints
            .account_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| NAME_NOT_FOUND.to_owned()),
        account_number: account_number.to_owned(),
        bank: bank_display_name(hints.bank.as_deref()),
        message: WARNING_MESSAGE.to_owned(),
        matched_type: MatchedType::None,
    }
}
