// 📋 Address Extractor - Role-tagged address tuples from one form row
// Branch-determined by the "is the new billing address the same?" answer

use crate::index::normalize_account_id;
use crate::records::{AddressRecord, AddressRole, SubmissionRow};
use crate::schema::{BoundSchema, RoleColumns};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// SUBMISSION DEFECT
// ============================================================================

/// Per-row data-quality condition found during extraction. Never aborts the
/// run; the engine degrades the submission to UNMATCHED with this as reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubmissionDefect {
    /// Pickup-count answer is neither numeric 0-3 nor a recognized word
    MalformedPickupCount(String),

    /// Declared pickup count disagrees with the non-empty pickup blocks
    /// actually present on the form
    PickupBlockMismatch { declared: usize, present: usize },
}

impl fmt::Display for SubmissionDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionDefect::MalformedPickupCount(raw) => {
                write!(f, "unrecognized pickup count {:?} (treated as zero)", raw)
            }
            SubmissionDefect::PickupBlockMismatch { declared, present } => {
                write!(
                    f,
                    "declared pickup count {} but {} pickup address block(s) filled in",
                    declared, present
                )
            }
        }
    }
}

// ============================================================================
// ADDRESS EXTRACTOR
// ============================================================================

/// Reads one submission row's schema-driven address blocks and produces
/// role-tagged AddressRecords.
pub struct AddressExtractor<'a> {
    schema: &'a BoundSchema,
}

impl<'a> AddressExtractor<'a> {
    pub fn new(schema: &'a BoundSchema) -> Self {
        AddressExtractor { schema }
    }

    /// Extract the addresses this row submits. An affirmative discriminator
    /// yields exactly one UNIFIED record; otherwise one BILLING, one
    /// DELIVERY, and zero to three PICKUP records.
    pub fn extract(&self, row: &SubmissionRow) -> Result<Vec<AddressRecord>, SubmissionDefect> {
        let account_id = normalize_account_id(row.get(&self.schema.account));
        let answer = row.get(&self.schema.discriminator).to_lowercase();

        if answer == "yes" {
            return Ok(vec![self.read_block(
                row,
                &self.schema.unified,
                &account_id,
                AddressRole::Unified,
                1,
            )]);
        }

        let mut records = vec![
            self.read_block(row, &self.schema.billing, &account_id, AddressRole::Billing, 1),
            self.read_block(
                row,
                &self.schema.delivery,
                &account_id,
                AddressRole::Delivery,
                1,
            ),
        ];

        let pickups: Vec<AddressRecord> = self
            .schema
            .pickups
            .iter()
            .enumerate()
            .map(|(i, block)| {
                self.read_block(row, block, &account_id, AddressRole::Pickup, (i + 1) as u8)
            })
            .filter(|record| !record.is_empty())
            .collect();

        let declared = match &self.schema.pickup_count {
            Some(column) => {
                let raw = row.get(column);
                if raw.is_empty() {
                    // Count column left blank: take the filled-in blocks as-is
                    pickups.len()
                } else {
                    parse_pickup_count(raw)
                        .ok_or_else(|| SubmissionDefect::MalformedPickupCount(raw.to_string()))?
                }
            }
            None => pickups.len(),
        };

        if declared != pickups.len() {
            return Err(SubmissionDefect::PickupBlockMismatch {
                declared,
                present: pickups.len(),
            });
        }

        // Re-sequence so pickups are numbered 1..=n even when an earlier
        // block was left empty
        for (i, mut pickup) in pickups.into_iter().enumerate() {
            pickup.sequence = (i + 1) as u8;
            records.push(pickup);
        }

        Ok(records)
    }

    /// Contact/attention name carried through to upload rows, when the form
    /// has that column.
    pub fn contact_name(&self, row: &SubmissionRow) -> String {
        self.schema
            .contact
            .as_deref()
            .map(|column| row.get(column).to_string())
            .unwrap_or_default()
    }

    fn read_block(
        &self,
        row: &SubmissionRow,
        block: &RoleColumns,
        account_id: &str,
        role: AddressRole,
        sequence: u8,
    ) -> AddressRecord {
        AddressRecord {
            account_id: account_id.to_string(),
            role,
            sequence,
            line1: row.get(&block.line1).to_string(),
            line2: row.get(&block.line2).to_string(),
            line3: row.get(&block.line3).to_string(),
            city: block
                .city
                .as_deref()
                .map(|column| row.get(column).to_string())
                .unwrap_or_default(),
        }
    }
}

/// Parse a pickup count: numeric 0-3 (tolerating a float-coerced ".0"
/// suffix) or the word-numbers the form accepts. Counts above three are
/// capped at three. Returns None for anything unrecognized.
pub fn parse_pickup_count(raw: &str) -> Option<usize> {
    let cleaned = raw.trim().to_lowercase();
    let cleaned = cleaned.strip_suffix(".0").unwrap_or(&cleaned);

    match cleaned {
        "zero" | "none" => return Some(0),
        "one" => return Some(1),
        "two" => return Some(2),
        "three" => return Some(3),
        _ => {}
    }

    cleaned.parse::<usize>().ok().map(|n| n.min(3))
}

// ============================================================================
// TESTS
// ============================================================================
