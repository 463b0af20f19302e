//! Report persistence seam.
//!
//! The engine only talks to [`ReportStore`]; where reports actually live is
//! the caller's business. [`MemoryStore`] backs tests and the CLI.

use crate::report::{Report, UserId};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("report id already exists: {0}")]
    DuplicateId(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Keyed report persistence. Implementations own atomicity of create/delete.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create(&self, report: Report) -> StoreResult<Report>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Report>>;

    /// Reports owned by `owner`, in insertion order.
    async fn find_by_owner(&self, owner: UserId) -> StoreResult<Vec<Report>>;

    /// Reports that are public or owned by `owner`, in insertion order.
    async fn find_public_or_owned(&self, owner: UserId) -> StoreResult<Vec<Report>>;

    /// Returns whether a report was removed.
    async fn delete_by_id(&self, id: &str) -> StoreResult<bool>;
}

/// In-process store keeping reports in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    reports: RwLock<Vec<Report>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn create(&self, report: Report) -> StoreResult<Report> {
        let mut reports = self.reports.write().await;
        if reports.iter().any(|r| r.id == report.id) {
            return Err(StoreError::DuplicateId(report.id));
        }
        reports.push(report.clone());
        Ok(report)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Report>> {
        let reports = self.reports.read().await;
        Ok(reports.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_owner(&self, owner: UserId) -> StoreResult<Vec<Report>> {
        let reports = self.reports.read().await;
        Ok(reports
            .iter()
            .filter(|r| r.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn find_public_or_owned(&self, owner: UserId) -> StoreResult<Vec<Report>> {
        let reports = self.reports.read().await;
        Ok(reports
            .iter()
            .filter(|r| r.is_public || r.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        let mut reports = self.reports.write().await;
        let before = reports.len();
        reports.retain(|r| r.id != id);
        Ok(reports.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_find_delete() {
        let store = MemoryStore::new();
        let mine = store
            .create(Report::new(1, "a.csv", 1, None, None, false))
            .await
            .unwrap();
        let theirs = store
            .create(Report::new(2, "b.csv", 1, None, None, true))
            .await
            .unwrap();
        store
            .create(Report::new(2, "c.csv", 1, None, None, false))
            .await
            .unwrap();

        assert_eq!(store.find_by_owner(1).await.unwrap().len(), 1);
        let visible = store.find_public_or_owned(1).await.unwrap();
        assert_eq!(
            visible.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec![mine.id.as_str(), theirs.id.as_str()]
        );

        assert!(matches!(
            store.create(mine.clone()).await,
            Err(StoreError::DuplicateId(_))
        ));

        assert!(store.delete_by_id(&mine.id).await.unwrap());
        assert!(!store.delete_by_id(&mine.id).await.unwrap());
        assert!(store.find_by_id(&mine.id).await.unwrap().is_none());
        assert_eq!(store.len().await, 2);
    }
}
