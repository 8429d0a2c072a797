//! Canonical identifier extraction and normalization.
//!
//! Extraction re-validates the populated record slots with stricter gates
//! than classification used to fill them. A slot set speculatively by a
//! classifier fallback that fails its gate here yields `unknown` rather
//! than letting a malformed identifier travel downstream.

use serde::Serialize;
use std::fmt::{self, Display, Formatter};

use crate::promptpay::{self, PromptPayRecord};

/// The semantic type of an extracted identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Reference,
    DonationBox,
    OrganizationRef,
    Mobile,
    TaxId,
    Account,
    Unknown,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Reference => "reference",
            IdentifierKind::DonationBox => "donationbox",
            IdentifierKind::OrganizationRef => "organizationref",
            IdentifierKind::Mobile => "mobile",
            IdentifierKind::TaxId => "taxid",
            IdentifierKind::Account => "account",
            IdentifierKind::Unknown => "unknown",
        }
    }
}

impl Display for IdentifierKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single canonical identifier resolved from a record.
///
/// `value` is `None` only when no slot passed its gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExtractedIdentifier {
    pub value: Option<String>,
    pub kind: IdentifierKind,
}

/// ASCII digits of `value`, in order, everything else stripped.
pub fn digits_of(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Resolve the canonical identifier of a decoded record.
///
/// Slots are tested in fixed priority; the first that validates wins.
/// References pass as-is (any non-empty text), every other slot must carry
/// its exact digit signature, and accounts need at least 10 digits.
pub fn extract(record: &PromptPayRecord) -> ExtractedIdentifier {
    if let Some(reference) = &record.reference_number {
        if !reference.is_empty() {
            return ExtractedIdentifier {
                value: Some(reference.clone()),
                kind: IdentifierKind::Reference,
            };
        }
    }

    if let Some(donation_box) = &record.donation_box_account {
        let digits = digits_of(donation_box);
        if digits.len() == 16 {
            return ExtractedIdentifier {
                value: Some(digits),
                kind: IdentifierKind::DonationBox,
            };
        }
    }

    if let Some(organization) = &record.organization_reference {
        let digits = digits_of(organization);
        if digits.len() == 17 {
            return ExtractedIdentifier {
                value: Some(digits),
                kind: IdentifierKind::OrganizationRef,
            };
        }
    }

    if let Some(phone) = &record.phone_number {
        let digits = digits_of(phone);
        if digits.len() == 10 && digits.starts_with('0') {
            return ExtractedIdentifier {
                value: Some(digits),
                kind: IdentifierKind::Mobile,
            };
        }
    }

    if let Some(tax_id) = &record.tax_id {
        let digits = digits_of(tax_id);
        if digits.len() == 13 {
            return ExtractedIdentifier {
                value: Some(digits),
                kind: IdentifierKind::TaxId,
            };
        }
    }

    if let Some(account) = &record.account_number {
        let digits = digits_of(account);
        if digits.len() >= 10 {
            return ExtractedIdentifier {
                value: Some(digits),
                kind: IdentifierKind::Account,
            };
        }
    }

    ExtractedIdentifier {
        value: None,
        kind: IdentifierKind::Unknown,
    }
}

/// Decode a payload and resolve its canonical identifier in one step.
pub fn extract_from_payload(payload: &str) -> ExtractedIdentifier {
    extract(&promptpay::parse(payload))
}

/// Normalization used as the registry lookup key: ASCII alphanumerics
/// only, lower-cased.
pub fn normalize(identifier: &str) -> String {
    identifier
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Thai mobile numbers are 10 digits with a leading zero.
pub fn is_valid_thai_mobile(mobile: &str) -> bool {
    let digits = digits_of(mobile);
    digits.len() == 10 && digits.starts_with('0')
}

/// Thai national id / tax id mod-11 checksum over the first 12 digits.
pub fn is_valid_thai_national_id(id: &str) -> bool {
    let digits = digits_of(id);
    if digits.len() != 13 {
        return false;
    }
    let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    let sum: u32 = values[..12]
        .iter()
        .enumerate()
        .map(|(position, digit)| digit * (13 - position as u32))
        .sum();
    let check = (11 - sum % 11) % 10;
    check == values[12]
}

/// Display formatting for a Thai mobile number: `0812345678` becomes
/// `081-234-5678`. Anything that is not 10 digits passes through.
pub fn format_mobile(mobile: &str) -> String {
    let digits = digits_of(mobile);
    if digits.len() != 10 {
        return mobile.to_owned();
    }
    format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
}

/// Display formatting for 10- and 13-digit account identifiers; other
/// lengths pass through unchanged.
pub fn format_account_number(account: &str) -> String {
    let digits = digits_of(account);
    match digits.len() {
        10 | 13 => format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        _ => account.to_owned(),
    }
}
