// 📤 Upload Projector - Expand matched outcomes into upload-template rows
// Fan-out rules fixed by the downstream bulk-update schema

use crate::engine::SubmissionOutcome;
use crate::normalize::normalize;
use crate::records::AddressRole;
use serde::{Deserialize, Serialize};

/// Invoice option codes a billing-capable address fans out into.
pub const INVOICE_OPTION_CODES: [&str; 3] = ["01", "02", "03"];

// ============================================================================
// UPLOAD ROW
// ============================================================================

/// One row of the upload-template table. Field order is the downstream
/// system's fixed column order; `Address 3` is its alias for line 3 and the
/// final column repeats the country code, both per that schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRow {
    #[serde(rename = "Account Number")]
    pub account_number: String,

    #[serde(rename = "Address Type")]
    pub address_type: String,

    #[serde(rename = "Invoice Option")]
    pub invoice_option: String,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Address Line 1")]
    pub address_line_1: String,

    #[serde(rename = "Address Line 2")]
    pub address_line_2: String,

    #[serde(rename = "City")]
    pub city: String,

    #[serde(rename = "Postal Code")]
    pub postal_code: String,

    #[serde(rename = "Country Code")]
    pub country_code: String,

    #[serde(rename = "Attention Name")]
    pub attention_name: String,

    #[serde(rename = "Address 3")]
    pub address_3: String,

    #[serde(rename = "Country/Territory Code")]
    pub country_territory_code: String,
}

// ============================================================================
// UPLOAD PROJECTOR
// ============================================================================

pub struct UploadProjector;

impl UploadProjector {
    /// Expand one outcome into its upload rows. Unmatched outcomes project
    /// to nothing. A billing (or unified, billing-equivalent) address
    /// expands into three rows, one per invoice option code; delivery and
    /// pickup addresses expand into exactly one row each with no invoice
    /// option, pickup sequence order preserved.
    pub fn project(outcome: &SubmissionOutcome) -> Vec<UploadRow> {
        if !outcome.is_matched() {
            return Vec::new();
        }

        let mut rows = Vec::new();
        for pair in &outcome.matched_pairs {
            let base = UploadRow {
                account_number: outcome.account_id.clone(),
                address_type: pair.submitted.role.code().to_string(),
                invoice_option: String::new(),
                name: pair.system.display_name.clone(),
                address_line_1: normalize(&pair.submitted.line1),
                address_line_2: normalize(&pair.submitted.line2),
                city: normalize(&pair.submitted.city),
                postal_code: pair.system.postal_code.clone(),
                country_code: pair.system.country_code.clone(),
                attention_name: outcome.contact_name.clone(),
                address_3: normalize(&pair.submitted.line3),
                country_territory_code: pair.system.country_code.clone(),
            };

            match pair.submitted.role {
                AddressRole::Billing | AddressRole::Unified => {
                    for option in INVOICE_OPTION_CODES {
                        rows.push(UploadRow {
                            invoice_option: option.to_string(),
                            ..base.clone()
                        });
                    }
                }
                AddressRole::Delivery | AddressRole::Pickup => {
                    rows.push(base);
                }
            }
        }
        rows
    }

    /// Flatten a whole report into the upload-template table.
    pub fn project_all(outcomes: &[SubmissionOutcome]) -> Vec<UploadRow> {
        outcomes.iter().flat_map(Self::project).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
