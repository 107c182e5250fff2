//! Record business rules
//!
//! The one invariant: no two records may share a title while both carry the
//! `active` status. Checked on create and update only; other statuses may
//! duplicate titles freely.

use crate::error::{ApiError, ApiResult};
use crate::models::{NewRecord, Record, RecordPatch, STATUS_ACTIVE};
use crate::storage::Database;
use std::sync::Arc;
use tracing::{debug, info};

pub struct RecordService {
    db: Arc<Database>,
}

impl RecordService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a record. Fails with a conflict when another active record
    /// already carries the same title.
    pub async fn create(&self, input: NewRecord) -> ApiResult<Record> {
        info!("Creating record: title={}, status={}", input.title, input.status);

        let mut tx = self.db.begin().await?;

        if input.status == STATUS_ACTIVE
            && tx.find_active_title(&input.title, None).await?.is_some()
        {
            return Err(ApiError::Conflict(
                "A record with this title already exists in active status.".to_string(),
            ));
        }

        let record = tx.insert(&input).await?;
        tx.commit().await?;

        Ok(record)
    }

    pub async fn get(&self, id: i64) -> ApiResult<Record> {
        let mut tx = self.db.begin().await?;
        let record = tx.find_by_id(id).await?.ok_or(ApiError::NotFound)?;
        tx.commit().await?;

        Ok(record)
    }

    /// All records newest-first, optionally filtered by status. An empty
    /// filter string means no filtering.
    pub async fn list(&self, status: Option<&str>) -> ApiResult<Vec<Record>> {
        let status = status.filter(|s| !s.is_empty());

        let mut tx = self.db.begin().await?;
        let records = tx.list(status).await?;
        tx.commit().await?;

        Ok(records)
    }

    /// Apply a partial update. The uniqueness check runs against the
    /// effective title and status (provided value, else stored value) and
    /// never counts the record being updated as its own conflict.
    pub async fn update(&self, id: i64, changes: RecordPatch) -> ApiResult<Record> {
        debug!("Updating record {}: {:?}", id, changes);

        let mut tx = self.db.begin().await?;
        let mut record = tx.find_by_id(id).await?.ok_or(ApiError::NotFound)?;

        let effective_title = changes.title.as_deref().unwrap_or(&record.title);
        let effective_status = changes.status.as_deref().unwrap_or(&record.status);

        if effective_status == STATUS_ACTIVE
            && tx
                .find_active_title(effective_title, Some(record.id))
                .await?
                .is_some()
        {
            return Err(ApiError::Conflict(
                "Another active record with this title already exists.".to_string(),
            ));
        }

        if let Some(title) = changes.title {
            record.title = title;
        }
        if let Some(description) = changes.description {
            record.description = Some(description);
        }
        if let Some(status) = changes.status {
            record.status = status;
        }

        tx.update(&mut record).await?;
        tx.commit().await?;

        Ok(record)
    }

    /// Hard delete. Reports not-found when the id never existed or was
    /// already removed.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        if !tx.delete(id).await? {
            return Err(ApiError::NotFound);
        }

        tx.commit().await?;
        info!("Deleted record {}", id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> RecordService {
        let db = Database::in_memory().await.expect("in-memory database");
        RecordService::new(Arc::new(db))
    }

    fn draft(title: &str, status: &str) -> NewRecord {
        NewRecord {
            title: title.to_string(),
            description: None,
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_the_created_record() {
        let service = service().await;

        let created = service
            .create(NewRecord {
                title: "Quarterly report".to_string(),
                description: Some("Q3 numbers".to_string()),
                status: "active".to_string(),
            })
            .await
            .unwrap();

        let fetched = service.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn duplicate_active_title_conflicts() {
        let service = service().await;

        service.create(draft("A", "active")).await.unwrap();

        let err = service.create(draft("A", "active")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Same title under a different status is fine
        let archived = service.create(draft("A", "archived")).await.unwrap();
        assert_eq!(archived.status, "archived");
    }

    #[tokio::test]
    async fn archiving_releases_the_title_for_reuse() {
        let service = service().await;

        let first = service.create(draft("A", "active")).await.unwrap();
        service
            .update(
                first.id,
                RecordPatch {
                    status: Some("archived".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let second = service.create(draft("A", "active")).await.unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let service = service().await;

        let err = service.get(999).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found_regardless_of_payload() {
        let service = service().await;

        let err = service
            .update(
                999,
                RecordPatch {
                    title: Some("anything".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));

        let err = service.update(999, RecordPatch::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn update_applies_only_provided_fields() {
        let service = service().await;

        let created = service
            .create(NewRecord {
                title: "Original".to_string(),
                description: Some("keep me".to_string()),
                status: "active".to_string(),
            })
            .await
            .unwrap();

        let updated = service
            .update(
                created.id,
                RecordPatch {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.description.as_deref(), Some("keep me"));
        assert_eq!(updated.status, "active");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn update_to_a_taken_active_title_conflicts_and_changes_nothing() {
        let service = service().await;

        let x = service.create(draft("A", "active")).await.unwrap();
        service.create(draft("B", "active")).await.unwrap();

        let err = service
            .update(
                x.id,
                RecordPatch {
                    title: Some("B".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // X is untouched
        let fetched = service.get(x.id).await.unwrap();
        assert_eq!(fetched, x);
    }

    #[tokio::test]
    async fn updating_a_record_with_its_own_title_is_not_a_conflict() {
        let service = service().await;

        let created = service.create(draft("A", "active")).await.unwrap();

        let updated = service
            .update(
                created.id,
                RecordPatch {
                    title: Some("A".to_string()),
                    description: Some("now with details".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "A");
        assert_eq!(updated.description.as_deref(), Some("now with details"));
    }

    #[tokio::test]
    async fn reactivating_onto_a_taken_title_conflicts() {
        let service = service().await;

        let parked = service.create(draft("A", "archived")).await.unwrap();
        service.create(draft("A", "active")).await.unwrap();

        let err = service
            .update(
                parked.id,
                RecordPatch {
                    status: Some("active".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_is_observably_idempotent() {
        let service = service().await;

        let created = service.create(draft("A", "active")).await.unwrap();

        service.delete(created.id).await.unwrap();

        let err = service.delete(created.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn list_honors_filter_and_ordering() {
        let service = service().await;

        let a = service.create(draft("A", "active")).await.unwrap();
        let b = service.create(draft("B", "archived")).await.unwrap();
        let c = service.create(draft("C", "active")).await.unwrap();

        let all: Vec<i64> = service
            .list(None)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(all, vec![c.id, b.id, a.id]);

        let active: Vec<i64> = service
            .list(Some("active"))
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(active, vec![c.id, a.id]);

        // Empty filter string behaves as no filter
        let unfiltered: Vec<i64> = service
            .list(Some(""))
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(unfiltered, all);
    }
}
