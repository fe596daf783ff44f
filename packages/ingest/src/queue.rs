//! Background upload queue.
//!
//! The upload handler enqueues an [`IngestJob`] and returns immediately;
//! a single worker task consumes jobs in order and runs the ingestion
//! pipeline. The acknowledgment response never waits on persistence, and
//! there is no cancellation — a job that has started runs to completion
//! or failure regardless of the client connection.

use std::sync::Arc;

use switchy_database::Database;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{ParsedUpload, run_ingestion};

/// One unit of background ingestion work.
#[derive(Debug)]
pub struct IngestJob {
    /// Identifier returned to the uploader in the acknowledgment. Each
    /// completed job is logged with this id, so a future status endpoint
    /// can key off it.
    pub upload_id: Uuid,
    /// The structurally validated upload.
    pub parsed: ParsedUpload,
}

/// Starts the ingestion worker and returns the job sender plus the worker
/// handle.
///
/// The worker runs until every sender is dropped. The server holds the
/// sender in its shared state and detaches the handle; tests keep the
/// handle to await drain.
#[must_use]
pub fn spawn_worker(
    db: Arc<dyn Database>,
) -> (
    mpsc::UnboundedSender<IngestJob>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<IngestJob>();

    let handle = tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let upload_id = job.upload_id;
            log::info!(
                "Upload {upload_id}: ingesting {} rows",
                job.parsed.total_rows()
            );

            let report = run_ingestion(db.as_ref(), &job.parsed).await;

            log::info!(
                "Upload {upload_id}: {} total, {} persisted, {} failed",
                report.total_rows,
                report.successful,
                report.failed,
            );
            for failure in &report.errors {
                log::debug!("Upload {upload_id}: row {}: {}", failure.row, failure.error);
            }
        }

        log::info!("Ingestion worker shutting down");
    });

    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_upload;
    use accident_analyser_database::{db, ensure_schema, queries};

    #[tokio::test]
    async fn worker_persists_enqueued_uploads() {
        let path = std::env::temp_dir().join(format!("queue-test-{}.db", Uuid::new_v4()));
        let db = db::connect(path.to_str().unwrap()).await.unwrap();
        ensure_schema(db.as_ref()).await.unwrap();
        let db: Arc<dyn Database> = Arc::from(db);

        let parsed = parse_upload(
            "accidents.csv",
            b"date,latitude,longitude,address,severity,road_type,weather,description,casualties,vehicles_involved\n\
              2024-01-15,51.5,-0.12,High St,Slight,A road,Fine,none,1,2\n\
              2024-01-16,51.6,-0.13,Low St,Fatal,B road,Raining,none,2,3",
        )
        .unwrap();

        let (tx, handle) = spawn_worker(Arc::clone(&db));
        tx.send(IngestJob {
            upload_id: Uuid::new_v4(),
            parsed,
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        let persisted = queries::list_accidents(db.as_ref(), 0, 100).await.unwrap();
        assert_eq!(persisted.len(), 2);
    }
}
