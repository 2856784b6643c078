//! Redis storage for credit profiles and projects

use crate::models::{CreditProfile, Project};
use anyhow::{Context, Result};
use devcred_common::DeveloperAddress;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

/// Storage backend for the funding ledger
pub struct Storage {
    conn: ConnectionManager,
}

impl Storage {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }

    /// Get a developer's credit profile
    pub async fn get_profile(
        &mut self,
        developer: &DeveloperAddress,
    ) -> Result<Option<CreditProfile>> {
        let key = format!("profile:{}", developer);

        let json: Option<String> = self.conn.get(&key).await?;

        match json {
            Some(data) => {
                let profile: CreditProfile = serde_json::from_str(&data)
                    .context("Failed to deserialize credit profile")?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    /// Store a developer's credit profile
    pub async fn put_profile(&mut self, profile: &CreditProfile) -> Result<()> {
        let key = format!("profile:{}", profile.developer);

        let json = serde_json::to_string(profile)
            .context("Failed to serialize credit profile")?;

        let _: () = self.conn.set(&key, json).await?;

        debug!(
            "Stored profile for {}: funded={} repaid={} active={}",
            profile.developer,
            profile.total_funded,
            profile.total_repaid,
            profile.active_loan_amount
        );
        Ok(())
    }

    /// Allocate the next project id
    pub async fn next_project_id(&mut self) -> Result<u64> {
        let id: u64 = self.conn.incr("project:next_id", 1).await?;
        Ok(id)
    }

    /// Get a project by id
    pub async fn get_project(&mut self, project_id: u64) -> Result<Option<Project>> {
        let key = format!("project:{}", project_id);

        let json: Option<String> = self.conn.get(&key).await?;

        match json {
            Some(data) => {
                let project: Project = serde_json::from_str(&data)
                    .context("Failed to deserialize project")?;
                Ok(Some(project))
            }
            None => Ok(None),
        }
    }

    /// Store a project and index it under its developer
    pub async fn put_project(&mut self, project: &Project) -> Result<()> {
        let key = format!("project:{}", project.id);

        let json = serde_json::to_string(project)
            .context("Failed to serialize project")?;

        let _: () = self.conn.set(&key, json).await?;

        let index_key = format!("projects:developer:{}", project.developer);
        let _: () = self.conn.sadd(&index_key, project.id).await?;

        debug!("Stored project {} for {}", project.id, project.developer);
        Ok(())
    }

    /// Get all projects for a developer, newest first
    pub async fn developer_projects(
        &mut self,
        developer: &DeveloperAddress,
    ) -> Result<Vec<Project>> {
        let index_key = format!("projects:developer:{}", developer);

        let project_ids: Vec<u64> = self.conn.smembers(&index_key).await?;

        let mut projects = Vec::new();
        for project_id in project_ids {
            if let Some(project) = self.get_project(project_id).await? {
                projects.push(project);
            }
        }

        projects.sort_by(|a, b| b.funded_at.cmp(&a.funded_at));

        Ok(projects)
    }

    /// Atomically claim the per-developer funding slot.
    ///
    /// Returns false when the developer already has an open project; at most
    /// one funding request may be in flight per developer.
    pub async fn acquire_funding_lock(
        &mut self,
        developer: &DeveloperAddress,
        project_id: u64,
    ) -> Result<bool> {
        let key = format!("funding:active:{}", developer);

        // SET NX - atomic claim
        let set_result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(project_id)
            .arg("NX")
            .query_async(&mut self.conn)
            .await?;

        Ok(set_result.is_some())
    }

    /// Release the per-developer funding slot at settlement
    pub async fn release_funding_lock(&mut self, developer: &DeveloperAddress) -> Result<()> {
        let key = format!("funding:active:{}", developer);
        let _: () = self.conn.del(&key).await?;

        info!("Released funding slot for {}", developer);
        Ok(())
    }

    /// Get the developer's currently open project id, if any
    pub async fn active_project_id(
        &mut self,
        developer: &DeveloperAddress,
    ) -> Result<Option<u64>> {
        let key = format!("funding:active:{}", developer);

        let id: Option<u64> = self.conn.get(&key).await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Milestone;

    async fn get_test_storage() -> Storage {
        Storage::new("redis://127.0.0.1:6379/15")
            .await
            .expect("Failed to connect to test Redis")
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_profile_roundtrip() {
        let mut storage = get_test_storage().await;

        let developer = DeveloperAddress::new([3u8; 20]);
        let mut profile = CreditProfile::new(developer, 640);
        profile.record_disbursement(2_000);

        storage.put_profile(&profile).await.unwrap();

        let retrieved = storage.get_profile(&developer).await.unwrap().unwrap();
        assert_eq!(retrieved.total_funded, 2_000);
        assert_eq!(retrieved.active_loan_amount, 2_000);
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_project_index_and_ids() {
        let mut storage = get_test_storage().await;

        let developer = DeveloperAddress::new([4u8; 20]);
        let id = storage.next_project_id().await.unwrap();
        let project = Project::new(
            id,
            developer,
            "indexer".to_string(),
            "https://github.com/example/indexer".to_string(),
            1_000,
            vec![Milestone::new("ship".to_string(), 1_000)],
        );

        storage.put_project(&project).await.unwrap();

        let projects = storage.developer_projects(&developer).await.unwrap();
        assert!(projects.iter().any(|p| p.id == id));
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_funding_lock_is_exclusive() {
        let mut storage = get_test_storage().await;

        let developer = DeveloperAddress::new([5u8; 20]);
        storage.release_funding_lock(&developer).await.unwrap();

        assert!(storage.acquire_funding_lock(&developer, 10).await.unwrap());
        assert!(!storage.acquire_funding_lock(&developer, 11).await.unwrap());
        assert_eq!(
            storage.active_project_id(&developer).await.unwrap(),
            Some(10)
        );

        storage.release_funding_lock(&developer).await.unwrap();
        assert!(storage.acquire_funding_lock(&developer, 12).await.unwrap());

        storage.release_funding_lock(&developer).await.unwrap();
    }
}
