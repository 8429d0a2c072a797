/* Copyright (c) 2026 Olle Mårtensson. This Source Code Form is subject to the terms of the Eclipse Public License, v. 2.0. */
//! Truadboon: Thai donation account verification.
//!
//! This crate decodes PromptPay EMV-QR payloads, classifies which of the
//! Thai identifier forms a payload carries (mobile, tax id, e-wallet,
//! organization reference, donation box, text reference), and verdicts
//! identifiers against a trusted-foundation registry and a fraud
//! blacklist.
//!
//! The decode/classify pipeline is pure and never fails: malformed input
//! degrades to a partial record and an `unknown` classification. Only the
//! verification engine touches external state, through injected registry
//! ports.
//!
//! # Examples
//! ```
//! use truadboon::{extract_identifier, IdentifierKind};
//!
//! let payload = concat!(
//!     "000201",
//!     "2643",
//!     "0016A000000677010111",
//!     "010202",
//!     "02131234567890123",
//!     "5303764",
//!     "5802TH",
//! );
//!
//! let extracted = extract_identifier(payload);
//! assert_eq!(extracted.kind, IdentifierKind::TaxId);
//! assert_eq!(extracted.value.as_deref(), Some("1234567890123"));
//! ```

mod error;
pub mod identifier;
pub mod promptpay;
pub mod registry;
pub mod tlv;
pub mod verify;

pub use error::{TruadboonError, TruadboonResult};
pub use identifier::{normalize, ExtractedIdentifier, IdentifierKind};
pub use promptpay::{PromptPayRecord, ProxyType};
pub use registry::{
    AuditEntry, AuditLog, BlacklistEntry, BlacklistLookup, FileRegistry, Foundation,
    FoundationLookup, InMemoryRegistry,
};
pub use verify::{
    MatchedType, VerificationResult, VerificationStatus, Verifier, VerifyHints,
};

/// Decode a raw PromptPay payload into its structured record.
pub fn decode_payload(payload: &str) -> PromptPayRecord {
    promptpay::parse(payload)
}

/// Decode a payload and resolve the single canonical identifier.
pub fn extract_identifier(payload: &str) -> ExtractedIdentifier {
    identifier::extract_from_payload(payload)
}

/// Receiver display name from tag 59, when present.
pub fn extract_receiver_name(payload: &str) -> Option<String> {
    promptpay::parse(payload).name
}
