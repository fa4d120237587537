// ⚖️ Reconciliation Engine - Classify submissions against the address of record
// One pass, one immutable outcome per submission

use crate::extract::{AddressExtractor, SubmissionDefect};
use crate::index::{normalize_account_id, RecordIndex};
use crate::normalize::normalize;
use crate::records::{AddressRecord, AddressRole, SubmissionRow, SubmissionTable, SystemRecord};
use crate::schema::{BoundSchema, SchemaError, SubmissionSchema};
use crate::similarity::{MatchConfig, SimilarityScorer};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// OUTCOME TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Matched,
    Unmatched,
}

/// Why a submission failed to reconcile. Recorded as data, never thrown;
/// one bad row degrades to UNMATCHED and the run continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnmatchedReason {
    AccountNotFound,
    /// No candidate for this role cleared the similarity threshold
    RoleBelowThreshold { role: AddressRole, sequence: u8 },
    PickupCountMismatch { submitted: usize, system: usize },
    MalformedPickupCount(String),
    PickupBlockMismatch { declared: usize, present: usize },
}

impl fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedReason::AccountNotFound => write!(f, "account not found"),
            UnmatchedReason::RoleBelowThreshold { role, sequence } => {
                if *role == AddressRole::Pickup {
                    write!(f, "pickup address #{} did not match any system address", sequence)
                } else {
                    write!(f, "{} address did not match any system address", role)
                }
            }
            UnmatchedReason::PickupCountMismatch { submitted, system } => {
                write!(f, "pickup count mismatch ({} vs {})", submitted, system)
            }
            UnmatchedReason::MalformedPickupCount(raw) => {
                write!(f, "unrecognized pickup count {:?} (treated as zero)", raw)
            }
            UnmatchedReason::PickupBlockMismatch { declared, present } => {
                write!(
                    f,
                    "declared pickup count {} but {} pickup address block(s) filled in",
                    declared, present
                )
            }
        }
    }
}

impl From<SubmissionDefect> for UnmatchedReason {
    fn from(defect: SubmissionDefect) -> Self {
        match defect {
            SubmissionDefect::MalformedPickupCount(raw) => {
                UnmatchedReason::MalformedPickupCount(raw)
            }
            SubmissionDefect::PickupBlockMismatch { declared, present } => {
                UnmatchedReason::PickupBlockMismatch { declared, present }
            }
        }
    }
}

/// One resolved (submitted, system) address pair with its match confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub submitted: AddressRecord,
    pub system: SystemRecord,
    pub score: f64,
}

/// Result of reconciling one submission. Created once during the pass,
/// immutable after creation, never merged or revised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub account_id: String,
    pub contact_name: String,
    pub decision: Decision,
    /// Populated only when unmatched
    pub reason: Option<UnmatchedReason>,
    /// Pairs in role order: unified, or billing / delivery / pickups 1..=n
    pub matched_pairs: Vec<MatchedPair>,
}

impl SubmissionOutcome {
    fn matched(account_id: String, contact_name: String, pairs: Vec<MatchedPair>) -> Self {
        SubmissionOutcome {
            account_id,
            contact_name,
            decision: Decision::Matched,
            reason: None,
            matched_pairs: pairs,
        }
    }

    fn unmatched(account_id: String, contact_name: String, reason: UnmatchedReason) -> Self {
        SubmissionOutcome {
            account_id,
            contact_name,
            decision: Decision::Unmatched,
            reason: Some(reason),
            matched_pairs: Vec::new(),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.decision == Decision::Matched
    }

    /// Human-readable reason string for the unmatched table.
    pub fn reason_text(&self) -> String {
        self.reason
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_default()
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    scorer: SimilarityScorer,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine {
            scorer: SimilarityScorer::new(),
        }
    }

    pub fn with_config(config: MatchConfig) -> Self {
        ReconciliationEngine {
            scorer: SimilarityScorer::with_config(config),
        }
    }

    /// One complete reconciliation pass: pure function of the two input
    /// tables plus configuration. Structural problems (missing columns) fail
    /// here, before any row is touched; per-row data problems degrade that
    /// row to UNMATCHED and the pass continues.
    pub fn reconcile(
        &self,
        submissions: &SubmissionTable,
        schema: &SubmissionSchema,
        index: &RecordIndex,
    ) -> Result<ReconciliationReport, SchemaError> {
        let bound = schema.bind(&submissions.headers)?;
        let extractor = AddressExtractor::new(&bound);

        let outcomes = submissions
            .rows
            .iter()
            .map(|row| self.reconcile_row(row, &bound, &extractor, index))
            .collect();

        Ok(ReconciliationReport {
            outcomes,
            reconciled_at: Utc::now(),
        })
    }

    fn reconcile_row(
        &self,
        row: &SubmissionRow,
        bound: &BoundSchema,
        extractor: &AddressExtractor,
        index: &RecordIndex,
    ) -> SubmissionOutcome {
        let account_id = normalize_account_id(row.get(&bound.account));
        let contact_name = extractor.contact_name(row);

        // Missing-account short-circuit, independent of the discriminator
        if !index.contains_account(&account_id) {
            debug!("{}: account not in system-of-record index", account_id);
            return SubmissionOutcome::unmatched(
                account_id,
                contact_name,
                UnmatchedReason::AccountNotFound,
            );
        }

        let records = match extractor.extract(row) {
            Ok(records) => records,
            Err(defect) => {
                debug!("{}: extraction defect: {}", account_id, defect);
                return SubmissionOutcome::unmatched(account_id, contact_name, defect.into());
            }
        };

        // Pickup-count consistency against the system of record
        let submitted_pickups = records
            .iter()
            .filter(|r| r.role == AddressRole::Pickup)
            .count();
        if submitted_pickups > 0 {
            let system_pickups = index.candidates(&account_id, AddressRole::Pickup).len();
            if submitted_pickups != system_pickups {
                debug!(
                    "{}: pickup count mismatch ({} vs {})",
                    account_id, submitted_pickups, system_pickups
                );
                return SubmissionOutcome::unmatched(
                    account_id,
                    contact_name,
                    UnmatchedReason::PickupCountMismatch {
                        submitted: submitted_pickups,
                        system: system_pickups,
                    },
                );
            }
        }

        let mut pairs = Vec::with_capacity(records.len());
        for record in records {
            match self.resolve(&record, index) {
                Some(pair) => pairs.push(pair),
                None => {
                    debug!(
                        "{}: no {} candidate cleared the threshold",
                        account_id, record.role
                    );
                    return SubmissionOutcome::unmatched(
                        account_id,
                        contact_name,
                        UnmatchedReason::RoleBelowThreshold {
                            role: record.role,
                            sequence: record.sequence,
                        },
                    );
                }
            }
        }

        SubmissionOutcome::matched(account_id, contact_name, pairs)
    }

    /// First candidate in stable input order that clears `is_match` wins.
    /// Deliberately not best-scoring: first-match-wins keeps re-runs
    /// byte-reproducible.
    fn resolve(&self, record: &AddressRecord, index: &RecordIndex) -> Option<MatchedPair> {
        let submitted = record.normalized();
        index
            .candidates(&record.account_id, record.role)
            .iter()
            .find(|candidate| {
                self.scorer
                    .is_match(submitted.as_str(), candidate.address.normalized().as_str())
            })
            .map(|candidate| MatchedPair {
                submitted: record.clone(),
                system: candidate.clone(),
                score: self
                    .scorer
                    .score(submitted.as_str(), candidate.address.normalized().as_str()),
            })
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

/// All outcomes of one pass, in original submission order.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub outcomes: Vec<SubmissionOutcome>,
    pub reconciled_at: DateTime<Utc>,
}

impl ReconciliationReport {
    pub fn matched(&self) -> impl Iterator<Item = &SubmissionOutcome> {
        self.outcomes.iter().filter(|o| o.is_matched())
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &SubmissionOutcome> {
        self.outcomes.iter().filter(|o| !o.is_matched())
    }

    pub fn matched_count(&self) -> usize {
        self.matched().count()
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched().count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciled {} submission(s): {} matched, {} unmatched",
            self.total(),
            self.matched_count(),
            self.unmatched_count()
        )
    }

    pub fn run_summary(&self) -> RunSummary {
        RunSummary {
            total: self.total(),
            matched: self.matched_count(),
            unmatched: self.unmatched_count(),
            reconciled_at: self.reconciled_at,
        }
    }

    /// Matched table: one row per matched role, score annotated.
    pub fn matched_rows(&self) -> Vec<MatchedRow> {
        self.matched()
            .flat_map(|outcome| {
                outcome.matched_pairs.iter().map(|pair| MatchedRow {
                    account_number: outcome.account_id.clone(),
                    address_type: pair.submitted.role.code().to_string(),
                    address_line_1: normalize(&pair.submitted.line1),
                    address_line_2: normalize(&pair.submitted.line2),
                    address_line_3: normalize(&pair.submitted.line3),
                    matched_system_address: pair.system.address.normalized().to_string(),
                    match_score: pair.score,
                })
            })
            .collect()
    }

    /// Unmatched table: one row per unmatched submission with its reason.
    pub fn unmatched_rows(&self) -> Vec<UnmatchedRow> {
        self.unmatched()
            .map(|outcome| UnmatchedRow {
                account_number: outcome.account_id.clone(),
                reason: outcome.reason_text(),
            })
            .collect()
    }
}

/// Machine-readable run summary for the `--json` CLI flag.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub reconciled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedRow {
    #[serde(rename = "Account Number")]
    pub account_number: String,

    #[serde(rename = "Address Type")]
    pub address_type: String,

    #[serde(rename = "Address Line 1")]
    pub address_line_1: String,

    #[serde(rename = "Address Line 2")]
    pub address_line_2: String,

    #[serde(rename = "Address Line 3")]
    pub address_line_3: String,

    #[serde(rename = "Matched System Address")]
    pub matched_system_address: String,

    #[serde(rename = "Match Score")]
    pub match_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmatchedRow {
    #[serde(rename = "Account Number")]
    pub account_number: String,

    #[serde(rename = "Reason")]
    pub reason: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{SubmissionRow, SystemRow};
    use std::collections::HashMap;

    fn schema() -> SubmissionSchema {
        SubmissionSchema::default()
    }

    fn headers() -> Vec<String> {
        let s = schema();
        let mut headers = vec![
            "Account Number".to_string(),
            "Is your new billing address the same as your pick up and delivery address?"
                .to_string(),
            "How many new Pick Up Addresses do you have?".to_string(),
        ];
        for block in [&s.unified, &s.billing, &s.delivery] {
            headers.extend([block.line1.clone(), block.line2.clone(), block.line3.clone()]);
        }
        for block in &s.pickups {
            headers.extend([block.line1.clone(), block.line2.clone(), block.line3.clone()]);
        }
        headers
    }

    fn row(fields: Vec<(String, String)>) -> SubmissionRow {
        SubmissionRow::new(fields.into_iter().collect::<HashMap<_, _>>())
    }

    fn unified_row(account: &str, answer: &str, line1: &str, line3: &str) -> SubmissionRow {
        let s = schema();
        row(vec![
            ("Account Number".to_string(), account.to_string()),
            (headers()[1].clone(), answer.to_string()),
            (s.unified.line1.clone(), line1.to_string()),
            (s.unified.line3.clone(), line3.to_string()),
        ])
    }

    fn system_row(account: &str, address_type: &str, line1: &str) -> SystemRow {
        SystemRow {
            account_number: account.to_string(),
            address_type: address_type.to_string(),
            name: "ACME VN CO LTD".to_string(),
            address_line_1: line1.to_string(),
            address_line_2: String::new(),
            address_line_3: String::new(),
            city: String::new(),
            postal_code: "700000".to_string(),
            country_code: "VN".to_string(),
        }
    }

    fn table(rows: Vec<SubmissionRow>) -> SubmissionTable {
        SubmissionTable {
            headers: headers(),
            rows,
        }
    }

    #[test]
    fn test_unified_match_case_insensitive_account() {
        // Submission "A100" / "yes", system account "a100" with UNIFIED role
        let engine = ReconciliationEngine::new();
        let index = RecordIndex::build(&[system_row("a100", "01", "123 LE LOI")]);
        let submissions = table(vec![unified_row("A100", "yes", "123 Le Loi", "Ward 1")]);

        let report = engine.reconcile(&submissions, &schema(), &index).unwrap();

        assert_eq!(report.matched_count(), 1);
        let outcome = &report.outcomes[0];
        assert!(outcome.is_matched());
        assert_eq!(outcome.matched_pairs.len(), 1);
        assert_eq!(outcome.matched_pairs[0].submitted.role, AddressRole::Unified);
        assert!(outcome.matched_pairs[0].score > 0.0);
    }

    #[test]
    fn test_account_not_found_short_circuits() {
        let engine = ReconciliationEngine::new();
        let index = RecordIndex::build(&[system_row("B999", "01", "somewhere else")]);

        // Same missing account under both discriminator branches
        for answer in ["yes", "no"] {
            let submissions = table(vec![unified_row("A100", answer, "123 Le Loi", "")]);
            let report = engine.reconcile(&submissions, &schema(), &index).unwrap();
            let outcome = &report.outcomes[0];
            assert!(!outcome.is_matched());
            assert_eq!(outcome.reason, Some(UnmatchedReason::AccountNotFound));
            assert_eq!(outcome.reason_text(), "account not found");
        }
    }

    #[test]
    fn test_pickup_count_mismatch() {
        let engine = ReconciliationEngine::new();
        let s = schema();
        let index = RecordIndex::build(&[
            system_row("A100", "03", "1 Billing St"),
            system_row("A100", "13", "2 Delivery St"),
            system_row("A100", "02", "3 Pickup St"),
            system_row("A100", "02", "4 Pickup St"),
            system_row("A100", "02", "5 Pickup St"),
        ]);
        let submissions = table(vec![row(vec![
            ("Account Number".to_string(), "A100".to_string()),
            (headers()[1].clone(), "No".to_string()),
            (s.billing.line1.clone(), "1 Billing St".to_string()),
            (s.delivery.line1.clone(), "2 Delivery St".to_string()),
            (
                "How many new Pick Up Addresses do you have?".to_string(),
                "2".to_string(),
            ),
            (s.pickups[0].line1.clone(), "3 Pickup St".to_string()),
            (s.pickups[1].line1.clone(), "4 Pickup St".to_string()),
        ])]);

        let report = engine.reconcile(&submissions, &schema(), &index).unwrap();
        let outcome = &report.outcomes[0];
        assert!(!outcome.is_matched());
        assert_eq!(
            outcome.reason,
            Some(UnmatchedReason::PickupCountMismatch {
                submitted: 2,
                system: 3
            })
        );
        assert_eq!(outcome.reason_text(), "pickup count mismatch (2 vs 3)");
    }

    #[test]
    fn test_split_roles_all_match() {
        let engine = ReconciliationEngine::new();
        let s = schema();
        let index = RecordIndex::build(&[
            system_row("A100", "03", "1 BILLING ST"),
            system_row("A100", "13", "2 DELIVERY ST"),
            system_row("A100", "02", "3 PICKUP ST"),
        ]);
        let submissions = table(vec![row(vec![
            ("Account Number".to_string(), "A100".to_string()),
            (headers()[1].clone(), "No".to_string()),
            (s.billing.line1.clone(), "1 Billing St".to_string()),
            (s.delivery.line1.clone(), "2 Delivery St".to_string()),
            (
                "How many new Pick Up Addresses do you have?".to_string(),
                "one".to_string(),
            ),
            (s.pickups[0].line1.clone(), "3 Pickup St".to_string()),
        ])]);

        let report = engine.reconcile(&submissions, &schema(), &index).unwrap();
        let outcome = &report.outcomes[0];
        assert!(outcome.is_matched());
        let roles: Vec<AddressRole> = outcome
            .matched_pairs
            .iter()
            .map(|p| p.submitted.role)
            .collect();
        assert_eq!(
            roles,
            vec![AddressRole::Billing, AddressRole::Delivery, AddressRole::Pickup]
        );
    }

    #[test]
    fn test_role_below_threshold_names_role() {
        let engine = ReconciliationEngine::new();
        let index = RecordIndex::build(&[system_row("A100", "01", "totally different place")]);
        let submissions = table(vec![unified_row("A100", "yes", "123 Le Loi", "")]);

        let report = engine.reconcile(&submissions, &schema(), &index).unwrap();
        let outcome = &report.outcomes[0];
        assert!(!outcome.is_matched());
        assert_eq!(
            outcome.reason,
            Some(UnmatchedReason::RoleBelowThreshold {
                role: AddressRole::Unified,
                sequence: 1
            })
        );
        assert!(outcome.reason_text().contains("unified"));
    }

    #[test]
    fn test_diacritic_variants_match_same_system_row() {
        let engine = ReconciliationEngine::new();
        let index = RecordIndex::build(&[system_row("A100", "01", "Duong Le Loi")]);
        let submissions = table(vec![
            unified_row("A100", "yes", "Đường Lê Lợi", ""),
            unified_row("A100", "yes", "Duong Le Loi", ""),
        ]);

        let report = engine.reconcile(&submissions, &schema(), &index).unwrap();
        assert_eq!(report.matched_count(), 2);
        let first = &report.outcomes[0].matched_pairs[0].system;
        let second = &report.outcomes[1].matched_pairs[0].system;
        assert_eq!(first, second);
    }

    #[test]
    fn test_first_candidate_wins() {
        let engine = ReconciliationEngine::new();
        // Both unified rows can only exist once per account in practice,
        // so exercise tie-breaking through two near-identical pickups
        let s = schema();
        let index = RecordIndex::build(&[
            system_row("A100", "03", "1 Billing St"),
            system_row("A100", "13", "2 Delivery St"),
            system_row("A100", "02", "9 Pickup Street"),
            system_row("A100", "02", "9 Pickup Street Annex"),
        ]);
        let submissions = table(vec![row(vec![
            ("Account Number".to_string(), "A100".to_string()),
            (headers()[1].clone(), "No".to_string()),
            (s.billing.line1.clone(), "1 Billing St".to_string()),
            (s.delivery.line1.clone(), "2 Delivery St".to_string()),
            (
                "How many new Pick Up Addresses do you have?".to_string(),
                "2".to_string(),
            ),
            (s.pickups[0].line1.clone(), "9 Pickup Street".to_string()),
            (s.pickups[1].line1.clone(), "9 Pickup Street Annex".to_string()),
        ])]);

        let report = engine.reconcile(&submissions, &schema(), &index).unwrap();
        let outcome = &report.outcomes[0];
        assert!(outcome.is_matched());
        // Both submitted pickups satisfy is_match against the first system
        // pickup; first-match-wins means both resolve to it
        assert_eq!(outcome.matched_pairs[2].system.address.line1, "9 Pickup Street");
        assert_eq!(outcome.matched_pairs[3].system.address.line1, "9 Pickup Street");
    }

    #[test]
    fn test_completeness_every_submission_classified_once() {
        let engine = ReconciliationEngine::new();
        let index = RecordIndex::build(&[system_row("A100", "01", "123 Le Loi")]);
        let submissions = table(vec![
            unified_row("A100", "yes", "123 Le Loi", ""),
            unified_row("B200", "yes", "456 Tran Phu", ""),
            unified_row("A100", "yes", "nothing like it at all", ""),
        ]);

        let report = engine.reconcile(&submissions, &schema(), &index).unwrap();
        assert_eq!(report.total(), 3);
        assert_eq!(report.matched_count() + report.unmatched_count(), 3);
    }

    #[test]
    fn test_deterministic_across_reruns() {
        let engine = ReconciliationEngine::new();
        let index = RecordIndex::build(&[
            system_row("A100", "01", "123 Le Loi"),
            system_row("B200", "01", "456 Tran Phu"),
        ]);
        let submissions = table(vec![
            unified_row("A100", "yes", "123 Le Loi", "Ward 1"),
            unified_row("B200", "yes", "456 tran phu", ""),
            unified_row("C300", "yes", "1 Nowhere", ""),
        ]);

        let first = engine.reconcile(&submissions, &schema(), &index).unwrap();
        let second = engine.reconcile(&submissions, &schema(), &index).unwrap();
        assert_eq!(first.outcomes, second.outcomes);
    }

    #[test]
    fn test_malformed_count_degrades_single_row() {
        let engine = ReconciliationEngine::new();
        let s = schema();
        let index = RecordIndex::build(&[
            system_row("A100", "03", "1 Billing St"),
            system_row("B200", "01", "123 Le Loi"),
        ]);
        let submissions = table(vec![
            row(vec![
                ("Account Number".to_string(), "A100".to_string()),
                (headers()[1].clone(), "No".to_string()),
                (s.billing.line1.clone(), "1 Billing St".to_string()),
                (s.delivery.line1.clone(), "2 Delivery St".to_string()),
                (
                    "How many new Pick Up Addresses do you have?".to_string(),
                    "several".to_string(),
                ),
            ]),
            unified_row("B200", "yes", "123 Le Loi", ""),
        ]);

        let report = engine.reconcile(&submissions, &schema(), &index).unwrap();
        assert_eq!(report.unmatched_count(), 1);
        assert_eq!(report.matched_count(), 1);
        assert_eq!(
            report.outcomes[0].reason,
            Some(UnmatchedReason::MalformedPickupCount("several".to_string()))
        );
    }

    #[test]
    fn test_matched_and_unmatched_rows() {
        let engine = ReconciliationEngine::new();
        let index = RecordIndex::build(&[system_row("A100", "01", "123 LE LOI")]);
        let submissions = table(vec![
            unified_row("A100", "yes", "123 Le Loi", "Ward 1"),
            unified_row("Z900", "yes", "1 Nowhere", ""),
        ]);

        let report = engine.reconcile(&submissions, &schema(), &index).unwrap();

        let matched = report.matched_rows();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].account_number, "A100");
        assert_eq!(matched[0].address_type, "01");
        assert_eq!(matched[0].address_line_1, "123 le loi");

        let unmatched = report.unmatched_rows();
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].account_number, "Z900");
        assert_eq!(unmatched[0].reason, "account not found");
    }
}
