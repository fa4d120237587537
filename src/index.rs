// 🗂️ Record Index - System-of-record rows grouped for O(1) candidate lookup
// Keyed by normalized account identifier, sub-grouped by address role

use crate::records::{AddressRecord, AddressRole, SystemRecord, SystemRow};
use log::warn;
use std::collections::HashMap;

/// Canonical account key: trimmed, spurious float-coercion ".0" stripped
/// from all-digit identifiers, uppercased for case-insensitive comparison.
pub fn normalize_account_id(raw: &str) -> String {
    let mut id = raw.trim();
    if let Some(stem) = id.strip_suffix(".0") {
        if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()) {
            id = stem;
        }
    }
    id.to_uppercase()
}

// ============================================================================
// RECORD INDEX
// ============================================================================

/// Read-only lookup structure over the system-of-record table, built once
/// per reconciliation pass.
#[derive(Debug, Default)]
pub struct RecordIndex {
    accounts: HashMap<String, HashMap<AddressRole, Vec<SystemRecord>>>,
}

impl RecordIndex {
    /// Group system rows by account and role. Rows with a blank account or
    /// an unrecognized address-type code are logged and skipped; pickup rows
    /// are sequenced in input order per account.
    pub fn build(rows: &[SystemRow]) -> Self {
        let mut accounts: HashMap<String, HashMap<AddressRole, Vec<SystemRecord>>> =
            HashMap::new();

        for (i, row) in rows.iter().enumerate() {
            let account_id = normalize_account_id(&row.account_number);
            if account_id.is_empty() {
                warn!("system row {}: blank account number, skipping", i + 1);
                continue;
            }

            let role = match AddressRole::from_code(&row.address_type) {
                Some(role) => role,
                None => {
                    warn!(
                        "system row {}: unrecognized address type {:?}, skipping",
                        i + 1,
                        row.address_type
                    );
                    continue;
                }
            };

            let by_role = accounts.entry(account_id.clone()).or_default();
            let group = by_role.entry(role).or_default();
            let sequence = (group.len() + 1) as u8;

            group.push(SystemRecord {
                address: AddressRecord {
                    account_id,
                    role,
                    sequence,
                    line1: row.address_line_1.trim().to_string(),
                    line2: row.address_line_2.trim().to_string(),
                    line3: row.address_line_3.trim().to_string(),
                    city: row.city.trim().to_string(),
                },
                display_name: row.name.trim().to_string(),
                postal_code: row.postal_code.trim().to_string(),
                country_code: row.country_code.trim().to_string(),
            });
        }

        RecordIndex { accounts }
    }

    /// Candidate addresses for an account/role pair. Unknown accounts and
    /// roles with no rows return an empty slice, never an error.
    pub fn candidates(&self, account_id: &str, role: AddressRole) -> &[SystemRecord] {
        self.accounts
            .get(&normalize_account_id(account_id))
            .and_then(|by_role| by_role.get(&role))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_account(&self, account_id: &str) -> bool {
        self.accounts.contains_key(&normalize_account_id(account_id))
    }

    /// Number of distinct accounts indexed.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
