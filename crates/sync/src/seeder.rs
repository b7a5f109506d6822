//! Conversion queue seeder.
//!
//! Sweeps the remote catalog for assets of a source file type and
//! enqueues a [`ConvertItem`] for each one not yet converted. Runs
//! once per conversion campaign, from the CLI.

use std::sync::Arc;

use damlink_core::convert::ConvertItem;
use damlink_core::error::CoreError;
use damlink_core::store::{AssetDataStore, WorkQueue};
use damlink_dam::types::SearchParams;
use damlink_dam::{DamApi, DamError};

/// Assets fetched per search page during the sweep.
const SEED_PAGE_SIZE: i64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum SeederError {
    #[error("catalog sweep failed: {0}")]
    Dam(#[from] DamError),
    #[error("queue seeding failed: {0}")]
    Store(#[from] CoreError),
}

/// Fills the conversion queue from a catalog sweep.
pub struct ConvertSeeder {
    dam: Arc<dyn DamApi>,
    asset_data: Arc<dyn AssetDataStore>,
    queue: Arc<dyn WorkQueue>,
}

impl ConvertSeeder {
    pub fn new(
        dam: Arc<dyn DamApi>,
        asset_data: Arc<dyn AssetDataStore>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self {
            dam,
            asset_data,
            queue,
        }
    }

    /// Enqueue a conversion for every `original_type` asset in the
    /// catalog without a completion record for this pair. Returns the
    /// number of items enqueued.
    ///
    /// The search query is a free-text match, so results are verified
    /// against the actual `filetype` field before enqueueing.
    pub async fn seed(
        &self,
        original_type: &str,
        destination_type: &str,
    ) -> Result<u64, SeederError> {
        let mut offset = 0i64;
        let mut enqueued = 0u64;

        loop {
            let params = SearchParams {
                limit: SEED_PAGE_SIZE,
                offset,
                query: Some(original_type.to_string()),
                types: Some("image".to_string()),
                ..SearchParams::default()
            };
            let results = self.dam.search_assets(&params).await?;
            if results.assets.is_empty() {
                break;
            }

            for asset in &results.assets {
                offset += 1;
                if !asset.filetype.eq_ignore_ascii_case(original_type) {
                    continue;
                }

                let item = ConvertItem::new(
                    asset.id.clone(),
                    asset.folder.as_ref().map(|f| f.id.clone()),
                    asset.filename.clone(),
                    original_type,
                    destination_type,
                );
                if self
                    .asset_data
                    .get(&asset.id, &item.completion_key())
                    .await?
                    .is_some()
                {
                    tracing::debug!(
                        asset_id = %asset.id,
                        conversion = %item.conversion_pair(),
                        "Already converted; skipping",
                    );
                    continue;
                }

                let payload = serde_json::to_value(&item).map_err(|e| {
                    CoreError::Internal(format!("convert item serialization failed: {e}"))
                })?;
                self.queue.push(payload).await?;
                enqueued += 1;
            }

            if offset >= results.total_count {
                break;
            }
        }

        tracing::info!(
            enqueued,
            original_type,
            destination_type,
            "Conversion queue seeded",
        );
        Ok(enqueued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use damlink_core::convert::ConvertStage;

    use crate::testsupport::{MemoryAssetData, MemoryQueue, MockDam};

    fn asset(id: &str, filename: &str, filetype: &str) -> serde_json::Value {
        serde_json::json!({ "id": id, "filename": filename, "filetype": filetype })
    }

    fn seeder(
        dam: Arc<MockDam>,
        data: Arc<MemoryAssetData>,
        queue: Arc<MemoryQueue>,
    ) -> ConvertSeeder {
        ConvertSeeder::new(dam, data, queue)
    }

    #[tokio::test]
    async fn enqueues_fresh_items_for_matching_assets() {
        let dam = Arc::new(MockDam::default());
        dam.push_search_results(
            2,
            vec![
                asset("A1", "photo.tiff", "tiff"),
                asset("A2", "scan.tiff", "TIFF"),
            ],
        );
        let queue = Arc::new(MemoryQueue::default());

        let count = seeder(dam, Arc::new(MemoryAssetData::default()), queue.clone())
            .seed("tiff", "png")
            .await
            .unwrap();

        assert_eq!(count, 2);
        let items: Vec<ConvertItem> = queue
            .snapshot()
            .into_iter()
            .map(|p| serde_json::from_value(p).unwrap())
            .collect();
        assert_eq!(items[0].asset_id, "A1");
        assert_eq!(items[0].stage, ConvertStage::QueueDownload);
        assert_eq!(items[1].asset_id, "A2");
    }

    #[tokio::test]
    async fn skips_assets_of_other_file_types() {
        let dam = Arc::new(MockDam::default());
        // Free-text search also matched a JPEG named after the query.
        dam.push_search_results(
            2,
            vec![
                asset("A1", "photo.tiff", "tiff"),
                asset("A2", "tiff-guide.jpg", "jpg"),
            ],
        );
        let queue = Arc::new(MemoryQueue::default());

        let count = seeder(dam, Arc::new(MemoryAssetData::default()), queue.clone())
            .seed("tiff", "png")
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(queue.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn skips_assets_already_converted() {
        let dam = Arc::new(MockDam::default());
        dam.push_search_results(
            2,
            vec![
                asset("A1", "photo.tiff", "tiff"),
                asset("A2", "scan.tiff", "tiff"),
            ],
        );
        let data = Arc::new(MemoryAssetData::default());
        data.set_sync("A1", "convert_tiff_to_png", serde_json::json!(true));
        let queue = Arc::new(MemoryQueue::default());

        let count = seeder(dam, data, queue.clone())
            .seed("tiff", "png")
            .await
            .unwrap();

        assert_eq!(count, 1);
        let item: ConvertItem = serde_json::from_value(queue.snapshot()[0].clone()).unwrap();
        assert_eq!(item.asset_id, "A2");
    }

    #[tokio::test]
    async fn pages_through_the_full_catalog() {
        let dam = Arc::new(MockDam::default());
        let first_page: Vec<serde_json::Value> = (0..50)
            .map(|n| asset(&format!("A{n}"), &format!("photo{n}.tiff"), "tiff"))
            .collect();
        dam.push_search_results(52, first_page);
        dam.push_search_results(
            52,
            vec![
                asset("A50", "photo50.tiff", "tiff"),
                asset("A51", "photo51.tiff", "tiff"),
            ],
        );
        let queue = Arc::new(MemoryQueue::default());

        let count = seeder(dam.clone(), Arc::new(MemoryAssetData::default()), queue.clone())
            .seed("tiff", "png")
            .await
            .unwrap();

        assert_eq!(count, 52);
        let searches = dam.searches();
        assert_eq!(searches.len(), 2);
        assert_eq!(searches[0].offset, 0);
        assert_eq!(searches[1].offset, 50);
    }

    #[tokio::test]
    async fn carries_the_folder_onto_the_item() {
        let dam = Arc::new(MockDam::default());
        dam.push_search_results(
            1,
            vec![serde_json::json!({
                "id": "A1",
                "filename": "photo.tiff",
                "filetype": "tiff",
                "folder": { "id": "F7" },
            })],
        );
        let queue = Arc::new(MemoryQueue::default());

        seeder(dam, Arc::new(MemoryAssetData::default()), queue.clone())
            .seed("tiff", "png")
            .await
            .unwrap();

        let item: ConvertItem = serde_json::from_value(queue.snapshot()[0].clone()).unwrap();
        assert_eq!(item.folder_id.as_deref(), Some("F7"));
    }

    #[tokio::test]
    async fn search_failure_propagates() {
        let dam = Arc::new(MockDam::default());
        // No pages scripted: the mock returns an API error.
        let result = seeder(
            dam,
            Arc::new(MemoryAssetData::default()),
            Arc::new(MemoryQueue::default()),
        )
        .seed("tiff", "png")
        .await;

        assert!(matches!(result, Err(SeederError::Dam(_))));
    }
}
