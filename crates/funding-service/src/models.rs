//! Data models for the funding ledger
//!
//! All lifecycle transitions live on the models as mutator methods so the
//! invariants can be exercised without storage. The machine module sequences
//! these against redis and the collaborator services.

use chrono::{DateTime, Utc};
use devcred_common::{DeveloperAddress, Error, Result};
use serde::{Deserialize, Serialize};

/// Confirmations required before a milestone may be completed
pub const CONFIRMATION_THRESHOLD: u32 = 3;

/// Milestone lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// Collecting confirmations
    Pending,
    /// Completed by the owning developer, reward released
    Completed,
    /// Project closed before completion
    Forfeited,
}

/// One milestone in a project's funding plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub description: String,

    /// Share of the project's funding amount, in whole dollars
    pub reward: u64,

    /// Attestations collected toward the completion threshold
    pub confirmations: u32,

    pub status: MilestoneStatus,

    /// When the milestone was completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Milestone {
    pub fn new(description: String, reward: u64) -> Self {
        Self {
            description,
            reward,
            confirmations: 0,
            status: MilestoneStatus::Pending,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != MilestoneStatus::Pending
    }
}

/// Outcome of a completion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The milestone transitioned to completed and its reward is due
    Completed { reward: u64 },
    /// The milestone was already completed; no-op, no duplicate reward
    AlreadyCompleted,
}

/// A funded project with its ordered milestone plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,

    pub developer: DeveloperAddress,

    pub name: String,

    pub source_repo_url: String,

    /// Amount disbursed into escrow at funding time, in whole dollars
    pub funding_amount: u64,

    pub funded_at: DateTime<Utc>,

    /// False once every milestone is completed or forfeited
    pub is_active: bool,

    pub milestones: Vec<Milestone>,
}

impl Project {
    pub fn new(
        id: u64,
        developer: DeveloperAddress,
        name: String,
        source_repo_url: String,
        funding_amount: u64,
        milestones: Vec<Milestone>,
    ) -> Self {
        Self {
            id,
            developer,
            name,
            source_repo_url,
            funding_amount,
            funded_at: Utc::now(),
            is_active: true,
            milestones,
        }
    }

    /// Sum of all milestone rewards; must never exceed `funding_amount`
    pub fn rewards_total(&self) -> u64 {
        self.milestones.iter().map(|m| m.reward).sum()
    }

    /// Record one confirmation toward a milestone's completion threshold.
    ///
    /// Confirming never completes the milestone by itself; confirmations on
    /// a terminal milestone are dropped silently since attestations race.
    pub fn confirm_milestone(&mut self, index: usize) -> Result<&Milestone> {
        if !self.is_active {
            return Err(Error::InvalidState(format!(
                "project {} is already settled",
                self.id
            )));
        }

        let milestone = self
            .milestones
            .get_mut(index)
            .ok_or_else(|| Error::NotFound(format!("milestone {} of project {}", index, self.id)))?;

        if !milestone.is_terminal() {
            milestone.confirmations += 1;
        }

        Ok(&self.milestones[index])
    }

    /// Check whether a completion attempt would succeed, without mutating.
    ///
    /// Returns `Some(reward)` when the milestone would transition, `None`
    /// when it is already completed (idempotent no-op). The ownership check
    /// comes first: a non-owner is rejected even on a completed milestone.
    pub fn completion_reward(
        &self,
        index: usize,
        caller: &DeveloperAddress,
    ) -> Result<Option<u64>> {
        if *caller != self.developer {
            return Err(Error::Unauthorized(format!(
                "only the project developer may complete milestones of project {}",
                self.id
            )));
        }

        let milestone = self
            .milestones
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("milestone {} of project {}", index, self.id)))?;

        match milestone.status {
            MilestoneStatus::Completed => Ok(None),
            MilestoneStatus::Forfeited => Err(Error::InvalidState(format!(
                "milestone {} of project {} was forfeited",
                index, self.id
            ))),
            MilestoneStatus::Pending => {
                if milestone.confirmations < CONFIRMATION_THRESHOLD {
                    return Err(Error::InvalidState(format!(
                        "milestone {} has {}/{} confirmations",
                        index, milestone.confirmations, CONFIRMATION_THRESHOLD
                    )));
                }
                Ok(Some(milestone.reward))
            }
        }
    }

    /// Complete a milestone. Same guards as `completion_reward`; completing
    /// an already-completed milestone is a no-op success.
    pub fn complete_milestone(
        &mut self,
        index: usize,
        caller: &DeveloperAddress,
    ) -> Result<CompletionOutcome> {
        match self.completion_reward(index, caller)? {
            None => Ok(CompletionOutcome::AlreadyCompleted),
            Some(reward) => {
                let milestone = &mut self.milestones[index];
                milestone.status = MilestoneStatus::Completed;
                milestone.completed_at = Some(Utc::now());
                Ok(CompletionOutcome::Completed { reward })
            }
        }
    }

    /// Whether every milestone has reached a terminal state
    pub fn is_settled(&self) -> bool {
        self.milestones.iter().all(|m| m.is_terminal())
    }

    /// Close the project: forfeit all pending milestones and deactivate.
    ///
    /// Returns the settlement split for ledger accounting.
    pub fn settle(&mut self, policy: &RepaymentPolicy) -> Result<Settlement> {
        if !self.is_active {
            return Err(Error::InvalidState(format!(
                "project {} is already settled",
                self.id
            )));
        }

        for milestone in &mut self.milestones {
            if !milestone.is_terminal() {
                milestone.status = MilestoneStatus::Forfeited;
            }
        }
        self.is_active = false;

        let completed_value: u64 = self
            .milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Completed)
            .map(|m| m.reward)
            .sum();
        let forfeited_value: u64 = self
            .milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Forfeited)
            .map(|m| m.reward)
            .sum();

        let completed_count = self
            .milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Completed)
            .count();

        let repayment_due =
            policy.required_repayment(forfeited_value, completed_count, self.milestones.len());

        Ok(Settlement {
            project_id: self.id,
            completed_value,
            forfeited_value,
            repayment_due,
        })
    }
}

/// Ledger split produced by settling a project
#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub project_id: u64,

    /// Value of completed milestones; cleared from the loan, nothing owed
    pub completed_value: u64,

    /// Value of forfeited milestones
    pub forfeited_value: u64,

    /// Portion of the forfeited value that must be repaid
    pub repayment_due: u64,
}

/// Repayment policy applied to the unearned portion at settlement.
///
/// A completed/total milestone ratio at or above the threshold counts as
/// significant progress: half the unearned amount is owed. Below it, the
/// full unearned amount is owed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentPolicy {
    pub significant_progress_ratio: f64,
}

impl Default for RepaymentPolicy {
    fn default() -> Self {
        Self {
            significant_progress_ratio: 0.5,
        }
    }
}

impl RepaymentPolicy {
    pub fn required_repayment(&self, unearned: u64, completed: usize, total: usize) -> u64 {
        if total == 0 {
            return unearned;
        }

        let ratio = completed as f64 / total as f64;
        if ratio >= self.significant_progress_ratio {
            unearned / 2
        } else {
            unearned
        }
    }
}

/// Per-developer credit profile, created on first successful funding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditProfile {
    pub developer: DeveloperAddress,

    /// Credit score at the last funding decision, 0-850
    pub credit_score: u16,

    /// Lifetime funding disbursed; never decreases
    pub total_funded: u64,

    /// Lifetime repayments received; never decreases
    pub total_repaid: u64,

    /// Disbursed-but-not-settled funding currently outstanding
    pub active_loan_amount: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_funding_time: Option<DateTime<Utc>>,

    /// Completed-milestone count across all projects
    pub reputation: u32,

    /// Profiles are never deleted, only deactivated
    pub is_active: bool,
}

impl CreditProfile {
    pub fn new(developer: DeveloperAddress, credit_score: u16) -> Self {
        Self {
            developer,
            credit_score,
            total_funded: 0,
            total_repaid: 0,
            active_loan_amount: 0,
            last_funding_time: None,
            reputation: 0,
            is_active: true,
        }
    }

    /// Record a disbursement against this profile
    pub fn record_disbursement(&mut self, amount: u64) {
        self.total_funded += amount;
        self.active_loan_amount += amount;
        self.last_funding_time = Some(Utc::now());
    }

    /// Validate a repayment amount against the outstanding loan
    pub fn ensure_can_repay(&self, amount: u64) -> Result<()> {
        if amount == 0 || amount > self.active_loan_amount {
            return Err(Error::InvalidAmount {
                amount,
                outstanding: self.active_loan_amount,
            });
        }
        Ok(())
    }

    /// Apply a repayment. Bounds are re-checked; the ledger is monotonic.
    pub fn repay(&mut self, amount: u64) -> Result<()> {
        self.ensure_can_repay(amount)?;
        self.total_repaid += amount;
        self.active_loan_amount -= amount;
        Ok(())
    }

    /// Apply a settlement split: the completed portion and the forgiven part
    /// of the unearned portion clear the loan; `repayment_due` stays
    /// outstanding until repaid.
    pub fn apply_settlement(&mut self, settlement: &Settlement) {
        let forgiven = settlement.forfeited_value - settlement.repayment_due;
        let cleared = settlement.completed_value + forgiven;
        self.active_loan_amount = self.active_loan_amount.saturating_sub(cleared);
    }

    /// Ledger invariant: outstanding loan never exceeds net funding
    pub fn invariant_holds(&self) -> bool {
        self.active_loan_amount <= self.total_funded - self.total_repaid
    }
}

/// One milestone in a funding request's plan
#[derive(Debug, Clone, Deserialize)]
pub struct MilestonePlanItem {
    pub description: String,

    pub reward: u64,
}

/// Request to fund a new project
#[derive(Debug, Deserialize)]
pub struct FundingRequest {
    pub developer: DeveloperAddress,

    pub name: String,

    pub source_repo_url: String,

    pub milestones: Vec<MilestonePlanItem>,
}

/// Response from a successful funding request
#[derive(Debug, Serialize)]
pub struct FundingResponse {
    pub project: Project,

    pub profile: CreditProfile,

    /// Custody transaction reference for the escrow disbursement
    pub tx_reference: String,
}

/// Request to complete a milestone; the caller must be the project developer
#[derive(Debug, Deserialize)]
pub struct CompleteMilestoneRequest {
    pub caller: DeveloperAddress,
}

/// Response from a completion attempt
#[derive(Debug, Serialize)]
pub struct CompleteMilestoneResponse {
    pub project: Project,

    /// True only on the call that actually transitioned the milestone
    pub reward_released: bool,

    /// Reward amount released on this call, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<u64>,

    /// Custody transaction reference for the reward release
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_reference: Option<String>,

    /// Settlement applied if this completion settled the project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Settlement>,
}

/// Request to settle (close) a project
#[derive(Debug, Deserialize)]
pub struct SettleProjectRequest {
    pub caller: DeveloperAddress,
}

/// Response from settling a project
#[derive(Debug, Serialize)]
pub struct SettleProjectResponse {
    pub project: Project,

    pub profile: CreditProfile,

    pub settlement: Settlement,
}

/// Request to repay part or all of the outstanding loan
#[derive(Debug, Deserialize)]
pub struct RepaymentRequest {
    pub developer: DeveloperAddress,

    pub amount: u64,
}

/// Response from a repayment
#[derive(Debug, Serialize)]
pub struct RepaymentResponse {
    pub profile: CreditProfile,

    /// Custody transaction reference for the repayment collection
    pub tx_reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev() -> DeveloperAddress {
        DeveloperAddress::new([1u8; 20])
    }

    fn other() -> DeveloperAddress {
        DeveloperAddress::new([2u8; 20])
    }

    fn project_with(milestones: Vec<(u64, u32)>) -> Project {
        let milestones = milestones
            .into_iter()
            .enumerate()
            .map(|(i, (reward, confirmations))| Milestone {
                description: format!("milestone {}", i),
                reward,
                confirmations,
                status: MilestoneStatus::Pending,
                completed_at: None,
            })
            .collect();
        Project::new(
            1,
            dev(),
            "search indexer".to_string(),
            "https://github.com/example/indexer".to_string(),
            2_000,
            milestones,
        )
    }

    #[test]
    fn test_rewards_never_exceed_funding() {
        let project = project_with(vec![(500, 0), (700, 0), (800, 0)]);
        assert!(project.rewards_total() <= project.funding_amount);
    }

    #[test]
    fn test_confirmation_does_not_complete() {
        let mut project = project_with(vec![(500, 0)]);

        for _ in 0..CONFIRMATION_THRESHOLD {
            project.confirm_milestone(0).unwrap();
        }

        assert_eq!(project.milestones[0].confirmations, CONFIRMATION_THRESHOLD);
        assert_eq!(project.milestones[0].status, MilestoneStatus::Pending);
    }

    #[test]
    fn test_completion_requires_threshold() {
        let mut project = project_with(vec![(500, CONFIRMATION_THRESHOLD - 1)]);

        let err = project.complete_milestone(0, &dev()).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_completion_requires_owner() {
        let mut project = project_with(vec![(500, CONFIRMATION_THRESHOLD)]);

        let err = project.complete_milestone(0, &other()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        assert_eq!(project.milestones[0].status, MilestoneStatus::Pending);
    }

    #[test]
    fn test_non_owner_rejected_even_when_completed() {
        let mut project = project_with(vec![(500, CONFIRMATION_THRESHOLD)]);
        project.complete_milestone(0, &dev()).unwrap();

        let err = project.complete_milestone(0, &other()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_double_completion_is_noop_success() {
        let mut project = project_with(vec![(500, CONFIRMATION_THRESHOLD)]);

        let first = project.complete_milestone(0, &dev()).unwrap();
        assert_eq!(first, CompletionOutcome::Completed { reward: 500 });
        let stamped = project.milestones[0].completed_at;
        assert!(stamped.is_some());

        let second = project.complete_milestone(0, &dev()).unwrap();
        assert_eq!(second, CompletionOutcome::AlreadyCompleted);
        // no duplicate reward, no re-stamp
        assert_eq!(project.milestones[0].completed_at, stamped);
    }

    #[test]
    fn test_confirmations_after_completion_are_dropped() {
        let mut project = project_with(vec![(500, CONFIRMATION_THRESHOLD)]);
        project.complete_milestone(0, &dev()).unwrap();

        project.confirm_milestone(0).unwrap();
        assert_eq!(project.milestones[0].confirmations, CONFIRMATION_THRESHOLD);
    }

    #[test]
    fn test_settle_forfeits_pending_and_deactivates() {
        let mut project = project_with(vec![(500, CONFIRMATION_THRESHOLD), (700, 0), (800, 0)]);
        project.complete_milestone(0, &dev()).unwrap();

        let settlement = project.settle(&RepaymentPolicy::default()).unwrap();

        assert!(!project.is_active);
        assert!(project.is_settled());
        assert_eq!(settlement.completed_value, 500);
        assert_eq!(settlement.forfeited_value, 1_500);
        // 1/3 completed: below the significant-progress threshold, full amount owed
        assert_eq!(settlement.repayment_due, 1_500);
    }

    #[test]
    fn test_settle_with_significant_progress_halves_repayment() {
        let mut project = project_with(vec![
            (500, CONFIRMATION_THRESHOLD),
            (700, CONFIRMATION_THRESHOLD),
            (800, 0),
        ]);
        project.complete_milestone(0, &dev()).unwrap();
        project.complete_milestone(1, &dev()).unwrap();

        let settlement = project.settle(&RepaymentPolicy::default()).unwrap();

        // 2/3 completed: significant progress, half the unearned amount owed
        assert_eq!(settlement.forfeited_value, 800);
        assert_eq!(settlement.repayment_due, 400);
    }

    #[test]
    fn test_settle_twice_rejected() {
        let mut project = project_with(vec![(500, 0)]);
        project.settle(&RepaymentPolicy::default()).unwrap();

        let err = project.settle(&RepaymentPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_operations_on_settled_project_rejected() {
        let mut project = project_with(vec![(500, 0)]);
        project.settle(&RepaymentPolicy::default()).unwrap();

        assert!(matches!(
            project.confirm_milestone(0).unwrap_err(),
            Error::InvalidState(_)
        ));
        assert!(matches!(
            project.complete_milestone(0, &dev()).unwrap_err(),
            Error::InvalidState(_)
        ));
    }

    #[test]
    fn test_profile_invariant_through_lifecycle() {
        let mut profile = CreditProfile::new(dev(), 650);
        assert!(profile.invariant_holds());

        profile.record_disbursement(2_000);
        assert!(profile.invariant_holds());
        assert_eq!(profile.active_loan_amount, 2_000);

        let mut project = project_with(vec![(500, CONFIRMATION_THRESHOLD), (700, 0), (800, 0)]);
        project.complete_milestone(0, &dev()).unwrap();
        let settlement = project.settle(&RepaymentPolicy::default()).unwrap();

        profile.apply_settlement(&settlement);
        assert!(profile.invariant_holds());
        // completed 500 cleared, nothing forgiven, 1500 still owed
        assert_eq!(profile.active_loan_amount, 1_500);

        profile.repay(1_500).unwrap();
        assert!(profile.invariant_holds());
        assert_eq!(profile.active_loan_amount, 0);
        assert_eq!(profile.total_repaid, 1_500);
    }

    #[test]
    fn test_repay_bounds() {
        let mut profile = CreditProfile::new(dev(), 650);
        profile.record_disbursement(1_000);

        let err = profile.repay(0).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));

        let err = profile.repay(1_001).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));

        // failed attempts leave the ledger unchanged
        assert_eq!(profile.total_repaid, 0);
        assert_eq!(profile.active_loan_amount, 1_000);

        profile.repay(400).unwrap();
        profile.repay(600).unwrap();
        assert_eq!(profile.active_loan_amount, 0);
        assert!(profile.invariant_holds());
    }

    #[test]
    fn test_repayment_policy_thresholds() {
        let policy = RepaymentPolicy::default();

        assert_eq!(policy.required_repayment(1_000, 0, 4), 1_000);
        assert_eq!(policy.required_repayment(1_000, 1, 4), 1_000);
        assert_eq!(policy.required_repayment(1_000, 2, 4), 500);
        assert_eq!(policy.required_repayment(1_000, 4, 4), 500);
    }
}
