// 📮 Record Types - Addresses, roles, and table rows
// Core data model shared by the extractor, index and engine

use crate::normalize::normalize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// ADDRESS ROLE
// ============================================================================

/// Semantic category of an address within an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressRole {
    /// One address serving billing, delivery and pickup at once
    Unified,
    Billing,
    Delivery,
    Pickup,
}

impl AddressRole {
    /// Downstream 2-character zero-padded address-type code.
    pub fn code(&self) -> &'static str {
        match self {
            AddressRole::Unified => "01",
            AddressRole::Pickup => "02",
            AddressRole::Billing => "03",
            AddressRole::Delivery => "13",
        }
    }

    /// Parse a raw type code as entered in the system export. Source files
    /// sometimes carry bare integers or float-coerced values ("1", "3.0"),
    /// so the code is zero-padded before comparison.
    pub fn from_code(raw: &str) -> Option<AddressRole> {
        match normalize_type_code(raw).as_str() {
            "01" => Some(AddressRole::Unified),
            "02" => Some(AddressRole::Pickup),
            "03" => Some(AddressRole::Billing),
            "13" => Some(AddressRole::Delivery),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AddressRole::Unified => "unified",
            AddressRole::Billing => "billing",
            AddressRole::Delivery => "delivery",
            AddressRole::Pickup => "pickup",
        }
    }
}

impl fmt::Display for AddressRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Normalize a raw address-type code to its fixed-width form:
/// trim, drop a float-coercion ".0" suffix, zero-pad to two characters.
pub fn normalize_type_code(raw: &str) -> String {
    let mut code = raw.trim();
    if let Some(stem) = code.strip_suffix(".0") {
        if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()) {
            code = stem;
        }
    }
    if code.len() == 1 && code.chars().all(|c| c.is_ascii_digit()) {
        format!("0{}", code)
    } else {
        code.to_string()
    }
}

// ============================================================================
// ADDRESS RECORD
// ============================================================================

/// One postal address attached to an account.
///
/// `(account_id, role, sequence)` uniquely identifies an address within a
/// submission; `sequence` disambiguates multiple pickup addresses (1..=3)
/// and is always 1 for the other roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub account_id: String,
    pub role: AddressRole,
    pub sequence: u8,
    pub line1: String,
    pub line2: String,
    pub line3: String,
    pub city: String,
}

impl AddressRecord {
    /// Derived comparison text: the non-empty lines joined with ", " and
    /// run through the normalizer. Commas survive normalization, so each
    /// source line becomes one comma component for the component-wise
    /// similarity signal. Always computed fresh from the source fields.
    pub fn normalized(&self) -> NormalizedAddress {
        let joined = [&self.line1, &self.line2, &self.line3]
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        NormalizedAddress {
            text: normalize(&joined),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.line1.trim().is_empty()
            && self.line2.trim().is_empty()
            && self.line3.trim().is_empty()
    }
}

/// Cached canonical comparison form of an AddressRecord's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAddress {
    text: String,
}

impl NormalizedAddress {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

// ============================================================================
// SYSTEM RECORD
// ============================================================================

/// An address-of-record entry plus the display fields the system holds
/// alongside it, propagated onto upload rows on a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRecord {
    pub address: AddressRecord,
    pub display_name: String,
    pub postal_code: String,
    pub country_code: String,
}

/// Raw system-of-record export row, as deserialized from CSV.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemRow {
    #[serde(rename = "Account Number")]
    pub account_number: String,

    #[serde(rename = "Address Type")]
    pub address_type: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Address Line 1", default)]
    pub address_line_1: String,

    #[serde(rename = "Address Line 2", default)]
    pub address_line_2: String,

    #[serde(rename = "Address Line 3", default)]
    pub address_line_3: String,

    #[serde(rename = "City", default)]
    pub city: String,

    #[serde(rename = "Postal Code", default)]
    pub postal_code: String,

    #[serde(rename = "Country Code", default)]
    pub country_code: String,
}

// ============================================================================
// SUBMISSION ROWS
// ============================================================================

/// One submission-form row, addressed by column header. The form's exact
/// column names vary between form versions, so rows stay header-addressed
/// and the SubmissionSchema decides which columns mean what.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionRow {
    fields: HashMap<String, String>,
}

impl SubmissionRow {
    pub fn new(fields: HashMap<String, String>) -> Self {
        SubmissionRow { fields }
    }

    /// Trimmed field value; missing columns read as empty.
    pub fn get(&self, column: &str) -> &str {
        self.fields
            .get(column)
            .map(|v| v.trim())
            .unwrap_or("")
    }

    pub fn is_blank(&self, column: &str) -> bool {
        self.get(column).is_empty()
    }
}

/// A loaded submission table: ordered headers plus header-addressed rows.
#[derive(Debug, Clone, Default)]
pub struct SubmissionTable {
    pub headers: Vec<String>,
    pub rows: Vec<SubmissionRow>,
}

impl SubmissionTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
