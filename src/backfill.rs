//! One-shot job assigning uuids to signatures created before they existed
use crate::error::StoreError;
use crate::store::{PetitionStore, UuidAssignment};
use serde::Serialize;
use tracing::{info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub scanned: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Records that could not be read, had no email to derive a uuid from,
    /// or changed mid-write.
    pub failed: usize,
}

/// Walks every signature in id order, batch by batch. Signatures that already
/// have a uuid are never written, so the job can be re-run or resumed.
pub struct BackfillSignatureUuids {
    batch_size: usize,
}

impl Default for BackfillSignatureUuids {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BackfillSignatureUuids {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn perform(&self, store: &PetitionStore) -> Result<BackfillReport, StoreError> {
        let mut report = BackfillReport::default();
        let mut cursor = None;

        loop {
            let batch = store.signatures_after(cursor, self.batch_size)?;
            let Some((last_id, _)) = batch.last() else {
                break;
            };
            cursor = Some(*last_id);

            for (id, record) in &batch {
                report.scanned += 1;
                let signature = match record {
                    Ok(signature) => signature,
                    Err(err) => {
                        warn!(signature_id = *id, error = %err, "unreadable signature, skipping");
                        report.failed += 1;
                        continue;
                    }
                };
                if signature.uuid.is_some() {
                    report.skipped += 1;
                    continue;
                }
                let uuid = match signature.derive_uuid() {
                    Ok(uuid) => uuid,
                    Err(err) => {
                        warn!(signature_id = signature.id, error = %err, "skipping signature");
                        report.failed += 1;
                        continue;
                    }
                };
                match store.assign_signature_uuid(signature.id, &uuid)? {
                    UuidAssignment::Assigned => report.updated += 1,
                    UuidAssignment::AlreadyPresent => report.skipped += 1,
                    UuidAssignment::Conflict => {
                        warn!(signature_id = signature.id, "signature changed during backfill");
                        report.failed += 1;
                    }
                }
            }
            info!(
                cursor = cursor,
                scanned = report.scanned,
                updated = report.updated,
                "backfill batch complete"
            );
        }

        info!(?report, "signature uuid backfill finished");
        Ok(report)
    }
}
