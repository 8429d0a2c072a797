use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use truadboon::registry::{
    AuditEntry, AuditLog, BlacklistEntry, BlacklistLookup, FileRegistry, Foundation,
    FoundationLookup, InMemoryRegistry,
};
use truadboon::verify::{MatchedType, VerificationStatus, Verifier, VerifyHints, WARNING_MESSAGE};
use truadboon::{TruadboonError, TruadboonResult};

fn seeded_verifier() -> (Arc<InMemoryRegistry>, Verifier) {
    let registry = Arc::new(InMemoryRegistry::seeded());
    let verifier = Verifier::from_registry(registry.clone());
    (registry, verifier)
}

#[test]
fn blacklisted_account_is_danger_with_stored_reason() {
    let (_, verifier) = seeded_verifier();
    let result = verifier
        .verify("0999999999", &VerifyHints::default())
        .expect("verify");

    assert_eq!(result.status, VerificationStatus::Danger);
    assert_eq!(result.matched_type, MatchedType::Blacklist);
    assert_eq!(result.message, "Fake charity scam - impersonating Red Cross");
}

#[test]
fn verified_foundation_is_safe() {
    let (_, verifier) = seeded_verifier();
    let result = verifier
        .verify("565-471106-1", &VerifyHints::default())
        .expect("verify");

    assert_eq!(result.status, VerificationStatus::Safe);
    assert_eq!(result.matched_type, MatchedType::Foundation);
    assert!(result.account_name.contains("Songklanagarind"));
    assert_eq!(result.account_number, "565-471106-1");
}

#[test]
fn normalized_lookup_matches_dashed_storage() {
    let (_, verifier) = seeded_verifier();
    // Stored as 045-3-04637-0; queried without separators.
    let result = verifier
        .verify("0453046370", &VerifyHints::default())
        .expect("verify");

    assert_eq!(result.status, VerificationStatus::Safe);
    assert!(result.account_name.contains("Red Cross"));
}

#[test]
fn unmatched_account_is_warning_with_name_fallback() {
    let (_, verifier) = seeded_verifier();
    let result = verifier
        .verify("1112223334", &VerifyHints::default())
        .expect("verify");

    assert_eq!(result.status, VerificationStatus::Warning);
    assert_eq!(result.matched_type, MatchedType::None);
    assert_eq!(result.account_name, "ไม่พบข้อมูล");
    assert_eq!(result.message, WARNING_MESSAGE);
}

#[test]
fn warning_uses_merchant_name_hint_when_present() {
    let (_, verifier) = seeded_verifier();
    let hints = VerifyHints {
        account_name: Some("Somchai Donation Drive".to_owned()),
        ..VerifyHints::default()
    };
    let result = verifier.verify("1112223334", &hints).expect("verify");

    assert_eq!(result.account_name, "Somchai Donation Drive");
}

#[test]
fn blacklist_outranks_foundation() {
    let mut registry = InMemoryRegistry::seeded();
    registry.add_blacklisted(BlacklistEntry {
        account_number: "565-471106-1".to_owned(),
        bank: None,
        reason: None,
        reported_by: None,
    });
    let verifier = Verifier::from_registry(Arc::new(registry));
    let result = verifier
        .verify("5654711061", &VerifyHints::default())
        .expect("verify");

    assert_eq!(result.status, VerificationStatus::Danger);
    assert_eq!(result.matched_type, MatchedType::Blacklist);
    // No stored reason: the generic fraud warning applies.
    assert_eq!(result.message, "บัญชีนี้อยู่ในรายชื่อมิจฉาชีพ ห้ามโอนเงิน!");
}

#[test]
fn unverified_foundation_is_only_a_warning() {
    let mut registry = InMemoryRegistry::new();
    registry.add_foundation(Foundation {
        name: "Pending Foundation".to_owned(),
        account_name: None,
        account_number: "1234567890".to_owned(),
        bank: "SCB".to_owned(),
        category: "Medical".to_owned(),
        verified: false,
    });
    let verifier = Verifier::from_registry(Arc::new(registry));
    let result = verifier
        .verify("1234567890", &VerifyHints::default())
        .expect("verify");

    assert_eq!(result.status, VerificationStatus::Warning);
    assert_eq!(result.matched_type, MatchedType::None);
}

#[test]
fn every_resolution_appends_exactly_one_audit_entry() {
    let (registry, verifier) = seeded_verifier();

    verifier
        .verify("0999999999", &VerifyHints::default())
        .expect("danger verify");
    verifier
        .verify("565-471106-1", &VerifyHints::default())
        .expect("safe verify");
    verifier
        .verify("1112223334", &VerifyHints::default())
        .expect("warning verify");

    let entries = registry.audit_entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].status, VerificationStatus::Danger);
    assert_eq!(entries[1].status, VerificationStatus::Safe);
    assert_eq!(entries[2].status, VerificationStatus::Warning);
    assert!(entries.iter().all(|entry| entry.source == "WEB"));
}

#[test]
fn identifier_without_alphanumerics_is_rejected_before_lookup() {
    let (registry, verifier) = seeded_verifier();
    let err = verifier
        .verify("-- --", &VerifyHints::default())
        .expect_err("must reject");

    match err {
        TruadboonError::InvalidIdentifier => {}
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(registry.audit_entries().is_empty());
}

struct FailingFoundations;

impl FoundationLookup for FailingFoundations {
    fn find_foundation(&self, _account_number: &str) -> TruadboonResult<Option<Foundation>> {
        Err(TruadboonError::Registry("connection refused".to_owned()))
    }
}

#[test]
fn registry_failure_fails_the_request() {
    let registry = Arc::new(InMemoryRegistry::seeded());
    let verifier = Verifier::new(Arc::new(FailingFoundations), registry.clone(), registry.clone());
    let err = verifier
        .verify("1112223334", &VerifyHints::default())
        .expect_err("must fail");

    match err {
        TruadboonError::Registry(message) => assert!(message.contains("connection refused")),
        other => panic!("unexpected error: {other:?}"),
    }
}

struct SlowBlacklist;

impl BlacklistLookup for SlowBlacklist {
    fn find_blacklisted(&self, _account_number: &str) -> TruadboonResult<Option<BlacklistEntry>> {
        thread::sleep(Duration::from_millis(500));
        Ok(None)
    }
}

#[test]
fn lookup_timeout_is_a_transport_failure() {
    let registry = Arc::new(InMemoryRegistry::seeded());
    let verifier = Verifier::new(registry.clone(), Arc::new(SlowBlacklist), registry.clone())
        .with_lookup_timeout(Duration::from_millis(50));
    let err = verifier
        .verify("1112223334", &VerifyHints::default())
        .expect_err("must time out");

    match err {
        TruadboonError::RegistryTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

struct FailingAudit;

impl AuditLog for FailingAudit {
    fn append(&self, _entry: AuditEntry) -> TruadboonResult<()> {
        Err(TruadboonError::AuditLog("disk full".to_owned()))
    }
}

#[test]
fn audit_failure_never_fails_the_response() {
    let registry = Arc::new(InMemoryRegistry::seeded());
    let verifier = Verifier::new(registry.clone(), registry.clone(), Arc::new(FailingAudit));
    let result = verifier
        .verify("565-471106-1", &VerifyHints::default())
        .expect("verify despite audit failure");

    assert_eq!(result.status, VerificationStatus::Safe);
}

#[test]
fn file_registry_round_trip() {
    let dir = TempDir::new().expect("tempdir");

    let foundations = vec![Foundation {
        name: "Mirror Foundation".to_owned(),
        account_name: None,
        account_number: "507-4-10183-8".to_owned(),
        bank: "SCB".to_owned(),
        category: "Medical".to_owned(),
        verified: true,
    }];
    let blacklist = vec![BlacklistEntry {
        account_number: "0999999999".to_owned(),
        bank: None,
        reason: Some("Fake charity scam".to_owned()),
        reported_by: None,
    }];
    fs::write(
        dir.path().join("foundations.json"),
        serde_json::to_string_pretty(&foundations).expect("encode foundations"),
    )
    .expect("write foundations");
    fs::write(
        dir.path().join("blacklist.json"),
        serde_json::to_string_pretty(&blacklist).expect("encode blacklist"),
    )
    .expect("write blacklist");

    let registry = Arc::new(FileRegistry::open(dir.path()).expect("open registry"));
    let verifier = Verifier::from_registry(registry);

    let safe = verifier
        .verify("5074101838", &VerifyHints::default())
        .expect("safe verify");
    assert_eq!(safe.status, VerificationStatus::Safe);
    assert_eq!(safe.account_name, "Mirror Foundation");

    let danger = verifier
        .verify("0999999999", &VerifyHints::default())
        .expect("danger verify");
    assert_eq!(danger.status, VerificationStatus::Danger);
    assert_eq!(danger.message, "Fake charity scam");

    let audit_raw = fs::read_to_string(dir.path().join("audit.log")).expect("read audit log");
    let entries: Vec<AuditEntry> = audit_raw
        .lines()
        .map(|line| serde_json::from_str(line).expect("audit line"))
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, VerificationStatus::Safe);
    assert_eq!(entries[1].status, VerificationStatus::Danger);
}

#[test]
fn file_registry_tolerates_missing_files() {
    let dir = TempDir::new().expect("tempdir");
    let registry = Arc::new(FileRegistry::open(dir.path()).expect("open registry"));
    let verifier = Verifier::from_registry(registry);

    let result = verifier
        .verify("1112223334", &VerifyHints::default())
        .expect("verify");
    assert_eq!(result.status, VerificationStatus::Warning);
}
