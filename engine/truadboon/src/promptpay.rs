//! PromptPay EMV-QR payload interpretation.
//!
//! A PromptPay payload is a top-level TLV stream whose merchant account
//! information field (tag 26, or 30 for the alternate vendor layout) nests
//! its own TLV stream carrying the proxy type and proxy value. Decoding
//! never fails: whatever cannot be interpreted is left absent and the
//! undecodable byte count is reported on the record.

use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use tracing::debug;

use crate::identifier::digits_of;
use crate::tlv::{self, TlvScanner};

/// PromptPay application identifier prefix expected in merchant-info tag 00.
pub const PROMPTPAY_AID_PREFIX: &str = "A0000006770101";

const TAG_MERCHANT_INFO: &str = "26";
const TAG_MERCHANT_INFO_ALT: &str = "30";
const TAG_CURRENCY: &str = "53";
const TAG_AMOUNT: &str = "54";
const TAG_COUNTRY: &str = "58";
const TAG_MERCHANT_NAME: &str = "59";
const TAG_ADDITIONAL_DATA: &str = "62";

/// Declared proxy type codes carried by merchant-info tag 01.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    Mobile,
    TaxId,
    Ewallet,
    OrganizationRef,
    Reference,
}

impl ProxyType {
    /// Maps a raw two-character code. Codes outside the known set resolve
    /// to `None`; the raw code is still retained on the record.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "01" => Some(ProxyType::Mobile),
            "02" => Some(ProxyType::TaxId),
            "03" => Some(ProxyType::Ewallet),
            "04" => Some(ProxyType::OrganizationRef),
            "09" => Some(ProxyType::Reference),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Mobile => "mobile",
            ProxyType::TaxId => "taxid",
            ProxyType::Ewallet => "ewallet",
            ProxyType::OrganizationRef => "organizationref",
            ProxyType::Reference => "reference",
        }
    }
}

impl Display for ProxyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured view of one decoded payload.
///
/// At most one identifier slot is set per well-formed payload; the
/// classifier guarantees this by construction. The record is immutable
/// once returned.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PromptPayRecord {
    pub proxy_type: Option<ProxyType>,
    pub proxy_type_code: Option<String>,
    pub phone_number: Option<String>,
    pub tax_id: Option<String>,
    pub account_number: Option<String>,
    pub organization_reference: Option<String>,
    pub donation_box_account: Option<String>,
    pub reference_number: Option<String>,
    /// Merchant/receiver display name (tag 59).
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub country: Option<String>,
    /// The merchant-info GUID matched the PromptPay application id.
    /// Informational only.
    pub promptpay_guid: bool,
    /// Bytes dropped across the top-level scan and sub-scans.
    pub dropped_bytes: usize,
    /// Original payload, retained for diagnostics.
    pub raw: String,
}

/// Decode a raw PromptPay payload into a [`PromptPayRecord`].
pub fn parse(payload: &str) -> PromptPayRecord {
    let mut record = PromptPayRecord {
        raw: payload.to_owned(),
        ..PromptPayRecord::default()
    };

    let decoded = tlv::scan(payload);
    record.dropped_bytes += decoded.dropped_bytes;

    for field in &decoded.fields {
        match field.tag {
            TAG_MERCHANT_INFO | TAG_MERCHANT_INFO_ALT => {
                parse_merchant_info(field.value, &mut record);
            }
            TAG_AMOUNT => record.amount = field.value.trim().parse().ok(),
            TAG_CURRENCY => {
                record.currency = Some(if field.value == "764" {
                    "THB".to_owned()
                } else {
                    field.value.to_owned()
                });
            }
            TAG_COUNTRY => record.country = Some(field.value.to_owned()),
            TAG_MERCHANT_NAME => record.name = Some(field.value.to_owned()),
            TAG_ADDITIONAL_DATA => {
                // The additional-data template (bill number 07, mobile 08)
                // is scanned but not mapped to any output field.
                record.dropped_bytes += tlv::scan(field.value).dropped_bytes;
            }
            _ => {}
        }
    }

    if record.dropped_bytes > 0 {
        debug!(dropped_bytes = record.dropped_bytes, "payload decoded partially");
    }

    record
}

/// Decode the merchant account information sub-TLV.
fn parse_merchant_info(data: &str, record: &mut PromptPayRecord) {
    let mut scanner = TlvScanner::new(data);
    let mut current_code: Option<String> = None;

    while let Some(field) = scanner.next() {
        // A zero-length sub-field reads as corruption; the rest of the
        // merchant scan is abandoned there.
        if field.length == 0 {
            record.dropped_bytes += data.len() - (scanner.offset() - tlv::HEADER_LEN);
            return;
        }
        match field.tag {
            "00" => {
                record.promptpay_guid = field.value.starts_with(PROMPTPAY_AID_PREFIX);
            }
            "01" => {
                // An over-long code is assumed defective; only the first
                // two characters count.
                let code: String = field.value.chars().take(2).collect();
                record.proxy_type = ProxyType::from_code(&code);
                record.proxy_type_code = Some(code.clone());
                current_code = Some(code);
            }
            "02" => {
                let declared = record
                    .proxy_type
                    .or_else(|| current_code.as_deref().and_then(ProxyType::from_code));
                classify_proxy(field.value, declared, current_code.as_deref(), record);
            }
            _ => {}
        }
    }

    record.dropped_bytes += scanner.dropped_bytes();
}

/// Place a proxy value into exactly one identifier slot.
///
/// The declared code is not trusted on its own: truncated and mislabeled
/// payloads are common, and the 16/17/13-digit length signatures of the
/// long-form Thai identifier types are the more reliable signal. Rule
/// order is a tie-break contract; reordering changes observable results.
fn classify_proxy(
    value: &str,
    declared: Option<ProxyType>,
    code: Option<&str>,
    record: &mut PromptPayRecord,
) {
    // REF.1 text references keep the value untouched, digits and all.
    if declared == Some(ProxyType::Reference) || code == Some("09") {
        record.reference_number = Some(value.to_owned());
        return;
    }

    let digits = digits_of(value);
    match digits.len() {
        16 => record.donation_box_account = Some(value.to_owned()),
        17 => record.organization_reference = Some(value.to_owned()),
        13 => record.tax_id = Some(value.to_owned()),
        10 if digits.starts_with('0') => record.phone_number = Some(value.to_owned()),
        _ => match declared {
            Some(ProxyType::Mobile) => record.phone_number = Some(value.to_owned()),
            Some(ProxyType::TaxId) => record.tax_id = Some(value.to_owned()),
            Some(ProxyType::Ewallet) => record.account_number = Some(value.to_owned()),
            Some(ProxyType::OrganizationRef) => {
                record.organization_reference = Some(value.to_owned());
            }
            _ => {
                if digits.is_empty() && !value.is_empty() {
                    // Opaque digit-free text reads as a reference.
                    record.reference_number = Some(value.to_owned());
                } else {
                    let mut account = digits;
                    account.truncate(16);
                    record.account_number = Some(account);
                }
            }
        },
    }
}
