// 📐 Submission Schema - Declarative role → column-name mapping
// Isolates the one genuinely variable part (the form's exact headers)
// from the stable matching algorithm

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// SCHEMA ERROR
// ============================================================================

/// Fatal, pre-loop structural problem: without the required columns there is
/// nothing to reconcile, so this aborts the run before any row is processed.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    MissingColumns {
        table: &'static str,
        columns: Vec<String>,
    },
    DiscriminatorNotFound {
        needle: String,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::MissingColumns { table, columns } => {
                write!(
                    f,
                    "{} table is missing required columns: {}",
                    table,
                    columns.join(", ")
                )
            }
            SchemaError::DiscriminatorNotFound { needle } => {
                write!(
                    f,
                    "key question column not found in submission file (no header contains {:?})",
                    needle
                )
            }
        }
    }
}

impl std::error::Error for SchemaError {}

// ============================================================================
// ROLE COLUMNS
// ============================================================================

/// Column names holding one address block on the submission form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleColumns {
    pub line1: String,
    pub line2: String,
    pub line3: String,
    pub city: Option<String>,
}

impl RoleColumns {
    fn new(line1: &str, line2: &str, line3: &str) -> Self {
        RoleColumns {
            line1: line1.to_string(),
            line2: line2.to_string(),
            line3: line3.to_string(),
            city: None,
        }
    }
}

// ============================================================================
// SUBMISSION SCHEMA
// ============================================================================

/// Declares, per address role, which submission columns hold the address
/// lines, plus the account, discriminator, pickup-count and contact columns.
/// The discriminator column is located by case-insensitive substring because
/// form exports carry it with varying surrounding text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSchema {
    pub account: String,
    /// Substring locating the "is the new billing address the same?" column
    pub discriminator_needle: String,
    pub pickup_count: Option<String>,
    pub contact: Option<String>,
    pub unified: RoleColumns,
    pub billing: RoleColumns,
    pub delivery: RoleColumns,
    pub pickups: [RoleColumns; 3],
}

const LINE1_SUFFIX: &str = "Line 1 (Address No., Industrial Park Name, etc)-In English Only";
const LINE2_SUFFIX: &str = "Line 2 (Street Name)-In English Only";
const LINE3_SUFFIX: &str = "Line 3 (Ward/Commune)-In English Only";

impl Default for SubmissionSchema {
    /// The Microsoft Forms headers used by the Vietnam address change form.
    fn default() -> Self {
        let block = |prefix: &str| {
            RoleColumns::new(
                &format!("{} {}", prefix, LINE1_SUFFIX),
                &format!("{} {}", prefix, LINE2_SUFFIX),
                &format!("{} {}", prefix, LINE3_SUFFIX),
            )
        };
        SubmissionSchema {
            account: "Account Number".to_string(),
            discriminator_needle: "is your new billing address".to_string(),
            pickup_count: Some("How many new Pick Up Addresses do you have?".to_string()),
            contact: Some("Contact Name".to_string()),
            unified: block("New Address"),
            billing: block("New Billing Address"),
            delivery: block("New Delivery Address"),
            pickups: [
                block("First New Pick Up Address"),
                block("Second New Pick Up Address"),
                block("Third New Pick Up Address"),
            ],
        }
    }
}

impl SubmissionSchema {
    /// Resolve this schema against the actual file headers, failing fast on
    /// missing required columns. Pickup blocks, the pickup-count column and
    /// the contact column are optional; everything else is required.
    pub fn bind(&self, headers: &[String]) -> Result<BoundSchema, SchemaError> {
        let has = |name: &str| headers.iter().any(|h| h.trim() == name);

        let needle = self.discriminator_needle.to_lowercase();
        let discriminator = headers
            .iter()
            .find(|h| h.to_lowercase().contains(&needle))
            .cloned()
            .ok_or_else(|| SchemaError::DiscriminatorNotFound {
                needle: self.discriminator_needle.clone(),
            })?;

        let mut missing = Vec::new();
        if !has(&self.account) {
            missing.push(self.account.clone());
        }
        for block in [&self.unified, &self.billing, &self.delivery] {
            for column in [&block.line1, &block.line2, &block.line3] {
                if !has(column) {
                    missing.push(column.clone());
                }
            }
        }
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns {
                table: "submission",
                columns: missing,
            });
        }

        let bind_block = |block: &RoleColumns| RoleColumns {
            line1: block.line1.clone(),
            line2: block.line2.clone(),
            line3: block.line3.clone(),
            city: block.city.clone().filter(|c| has(c)),
        };

        Ok(BoundSchema {
            account: self.account.clone(),
            discriminator,
            pickup_count: self.pickup_count.clone().filter(|c| has(c)),
            contact: self.contact.clone().filter(|c| has(c)),
            unified: bind_block(&self.unified),
            billing: bind_block(&self.billing),
            delivery: bind_block(&self.delivery),
            pickups: self
                .pickups
                .iter()
                .filter(|block| has(&block.line1))
                .map(bind_block)
                .collect(),
        })
    }
}

/// A schema resolved against one concrete file: the discriminator header is
/// pinned down, and optional columns absent from the file are dropped.
#[derive(Debug, Clone)]
pub struct BoundSchema {
    pub account: String,
    pub discriminator: String,
    pub pickup_count: Option<String>,
    pub contact: Option<String>,
    pub unified: RoleColumns,
    pub billing: RoleColumns,
    pub delivery: RoleColumns,
    /// Only the pickup blocks whose columns exist in this file
    pub pickups: Vec<RoleColumns>,
}

// ============================================================================
// SYSTEM TABLE VALIDATION
// ============================================================================

pub const SYSTEM_REQUIRED_COLUMNS: [&str; 3] =
    ["Account Number", "Address Type", "Address Line 1"];

/// Fail-fast header check for the system-of-record export.
pub fn validate_system_headers(headers: &[String]) -> Result<(), SchemaError> {
    let missing: Vec<String> = SYSTEM_REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h.trim() == **required))
        .map(|c| c.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns {
            table: "system-of-record",
            columns: missing,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
