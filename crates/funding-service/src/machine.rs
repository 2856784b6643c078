//! Project funding machine
//!
//! Sequences the funding lifecycle against storage and the collaborator
//! services: requested -> disbursed -> active -> settled. Entry guards are
//! fail-closed: a rejected request mutates nothing, and custody intents are
//! submitted before any ledger write.

use crate::custody_client::{CustodyApi, IntentKind};
use crate::models::{
    CompleteMilestoneResponse, CreditProfile, FundingRequest, FundingResponse, Milestone, Project,
    RepaymentPolicy, RepaymentRequest, RepaymentResponse, SettleProjectResponse, Settlement,
};
use crate::scoring_client::ScoringApi;
use crate::storage::Storage;
use devcred_common::{ceiling_for_score, DeveloperAddress, Error, Result, FUNDING_FLOOR_SCORE};
use std::sync::Arc;
use tracing::info;

/// Orchestrates profile and project mutations for one deployment
pub struct FundingMachine {
    storage: Storage,
    scoring: Arc<dyn ScoringApi>,
    custody: Arc<dyn CustodyApi>,
    policy: RepaymentPolicy,
}

/// Reject scores below the funding floor
fn eligibility_guard(score: u16) -> Result<()> {
    if score < FUNDING_FLOOR_SCORE {
        return Err(Error::IneligibleScore {
            score,
            floor: FUNDING_FLOOR_SCORE,
        });
    }
    Ok(())
}

/// Reject milestone plans whose rewards sum over the funding ceiling
fn budget_guard(rewards_total: u64, ceiling: u64) -> Result<()> {
    if rewards_total > ceiling {
        return Err(Error::BudgetExceeded {
            ceiling,
            requested: rewards_total,
        });
    }
    Ok(())
}

impl FundingMachine {
    pub fn new(
        storage: Storage,
        scoring: Arc<dyn ScoringApi>,
        custody: Arc<dyn CustodyApi>,
        policy: RepaymentPolicy,
    ) -> Self {
        Self {
            storage,
            scoring,
            custody,
            policy,
        }
    }

    /// Fund a new project against the developer's credit score.
    ///
    /// At most one open project per developer; the slot is claimed
    /// atomically before the custody intent goes out and released again if
    /// custody is unreachable.
    pub async fn request_funding(&mut self, request: FundingRequest) -> Result<FundingResponse> {
        let developer = request.developer;

        if request.milestones.is_empty() {
            return Err(Error::InvalidState(
                "milestone plan must not be empty".to_string(),
            ));
        }

        // a developer with no recorded score is scored 0, not special-cased
        let score = self
            .scoring
            .latest_score(&developer)
            .await?
            .map(|s| s.score)
            .unwrap_or(0);
        eligibility_guard(score)?;

        let funding_amount = ceiling_for_score(score);
        let rewards_total: u64 = request.milestones.iter().map(|m| m.reward).sum();
        budget_guard(rewards_total, funding_amount)?;

        let project_id = self.storage.next_project_id().await?;
        if !self
            .storage
            .acquire_funding_lock(&developer, project_id)
            .await?
        {
            return Err(Error::InvalidState(format!(
                "developer {} already has an open project",
                developer
            )));
        }

        // escrow funding goes out before any ledger write
        let tx_reference = match self
            .custody
            .submit_intent(
                &developer,
                funding_amount,
                IntentKind::Disburse,
                format!("project {} escrow", project_id),
            )
            .await
        {
            Ok(tx) => tx,
            Err(e) => {
                self.storage.release_funding_lock(&developer).await?;
                return Err(e);
            }
        };

        let milestones = request
            .milestones
            .into_iter()
            .map(|m| Milestone::new(m.description, m.reward))
            .collect();
        let project = Project::new(
            project_id,
            developer,
            request.name,
            request.source_repo_url,
            funding_amount,
            milestones,
        );

        let mut profile = self
            .storage
            .get_profile(&developer)
            .await?
            .unwrap_or_else(|| CreditProfile::new(developer, score));
        profile.credit_score = score;
        profile.record_disbursement(funding_amount);

        self.storage.put_project(&project).await?;
        self.storage.put_profile(&profile).await?;

        info!(
            "Funded project {} for {} ({} USDC at score {})",
            project_id, developer, funding_amount, score
        );

        Ok(FundingResponse {
            project,
            profile,
            tx_reference,
        })
    }

    /// Record one confirmation toward a milestone's completion threshold
    pub async fn confirm_milestone(&mut self, project_id: u64, index: usize) -> Result<Project> {
        let mut project = self.load_project(project_id).await?;

        project.confirm_milestone(index)?;
        self.storage.put_project(&project).await?;

        info!(
            "Milestone {} of project {} now has {} confirmations",
            index, project_id, project.milestones[index].confirmations
        );

        Ok(project)
    }

    /// Complete a milestone, releasing its reward from escrow.
    ///
    /// Idempotent past the first success. When the last milestone reaches a
    /// terminal state the project settles automatically.
    pub async fn complete_milestone(
        &mut self,
        project_id: u64,
        index: usize,
        caller: DeveloperAddress,
    ) -> Result<CompleteMilestoneResponse> {
        let mut project = self.load_project(project_id).await?;

        let reward = project.completion_reward(index, &caller)?;

        let Some(amount) = reward else {
            // already completed: no-op success, no duplicate reward
            return Ok(CompleteMilestoneResponse {
                project,
                reward_released: false,
                reward: None,
                tx_reference: None,
                settlement: None,
            });
        };

        // reward release goes out before the milestone flips
        let tx_reference = self
            .custody
            .submit_intent(
                &caller,
                amount,
                IntentKind::Release,
                format!("project {} milestone {} reward", project_id, index),
            )
            .await?;

        project.complete_milestone(index, &caller)?;

        let mut profile = self.load_profile(&project.developer).await?;
        profile.reputation += 1;

        let settlement = if project.is_settled() {
            let settlement = self.settle_accounting(&mut project, &mut profile).await?;
            Some(settlement)
        } else {
            None
        };

        self.storage.put_project(&project).await?;
        self.storage.put_profile(&profile).await?;

        info!(
            "Completed milestone {} of project {} ({} USDC released)",
            index, project_id, amount
        );

        Ok(CompleteMilestoneResponse {
            project,
            reward_released: true,
            reward: Some(amount),
            tx_reference: Some(tx_reference),
            settlement,
        })
    }

    /// Close a project early: pending milestones forfeit, the ledger splits
    /// the funding into cleared and still-owed portions per the repayment
    /// policy, and the developer's funding slot frees up.
    pub async fn settle_project(
        &mut self,
        project_id: u64,
        caller: DeveloperAddress,
    ) -> Result<SettleProjectResponse> {
        let mut project = self.load_project(project_id).await?;

        if caller != project.developer {
            return Err(Error::Unauthorized(format!(
                "only the project developer may settle project {}",
                project_id
            )));
        }

        let mut profile = self.load_profile(&project.developer).await?;
        let settlement = self.settle_accounting(&mut project, &mut profile).await?;

        self.storage.put_project(&project).await?;
        self.storage.put_profile(&profile).await?;

        Ok(SettleProjectResponse {
            project,
            profile,
            settlement,
        })
    }

    /// Repay part or all of the outstanding loan
    pub async fn repay(&mut self, request: RepaymentRequest) -> Result<RepaymentResponse> {
        let mut profile = self.load_profile(&request.developer).await?;

        // bounds are checked before the custody intent goes out
        profile.ensure_can_repay(request.amount)?;

        let tx_reference = self
            .custody
            .submit_intent(
                &request.developer,
                request.amount,
                IntentKind::Collect,
                "loan repayment".to_string(),
            )
            .await?;

        profile.repay(request.amount)?;
        self.storage.put_profile(&profile).await?;

        info!(
            "Repayment of {} recorded for {} ({} outstanding)",
            request.amount, request.developer, profile.active_loan_amount
        );

        Ok(RepaymentResponse {
            profile,
            tx_reference,
        })
    }

    /// Get a developer's credit profile
    pub async fn profile(&mut self, developer: &DeveloperAddress) -> Result<CreditProfile> {
        self.load_profile(developer).await
    }

    /// Get a project by id
    pub async fn project(&mut self, project_id: u64) -> Result<Project> {
        self.load_project(project_id).await
    }

    /// Get all projects for a developer, newest first
    pub async fn developer_projects(
        &mut self,
        developer: &DeveloperAddress,
    ) -> Result<Vec<Project>> {
        Ok(self.storage.developer_projects(developer).await?)
    }

    /// Shared settlement accounting for explicit and automatic settlement
    async fn settle_accounting(
        &mut self,
        project: &mut Project,
        profile: &mut CreditProfile,
    ) -> Result<Settlement> {
        let settlement = project.settle(&self.policy)?;
        profile.apply_settlement(&settlement);
        self.storage.release_funding_lock(&project.developer).await?;

        info!(
            "Settled project {}: {} completed, {} forfeited, {} owed",
            settlement.project_id,
            settlement.completed_value,
            settlement.forfeited_value,
            settlement.repayment_due
        );

        Ok(settlement)
    }

    async fn load_project(&mut self, project_id: u64) -> Result<Project> {
        self.storage
            .get_project(project_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("project {}", project_id)))
    }

    async fn load_profile(&mut self, developer: &DeveloperAddress) -> Result<CreditProfile> {
        self.storage
            .get_profile(developer)
            .await?
            .ok_or_else(|| Error::NotFound(format!("credit profile for {}", developer)))
    }
}
