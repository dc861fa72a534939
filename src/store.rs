//! sled-backed persistence for petitions and signatures
//!
//! Everything lives in one tree under prefixed keys so that a petition and
//! its creator signature can be written in a single atomic batch:
//!
//! - `petition/<id>` CBOR encoded [`Petition`]
//! - `signature/<id>` CBOR encoded [`Signature`]
//! - `petition_signatures/<petition id><signature id>` empty index entry
//!
//! Ids are big-endian so key order is id order.
use crate::error::StoreError;
use crate::petition::Petition;
use crate::signature::Signature;
use sled::{Batch, Db};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const PETITION_PREFIX: &[u8] = b"petition/";
const SIGNATURE_PREFIX: &[u8] = b"signature/";
const PETITION_SIGNATURES_PREFIX: &[u8] = b"petition_signatures/";

fn record_key(prefix: &[u8], id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn index_key(petition_id: u64, signature_id: u64) -> Vec<u8> {
    let mut key = record_key(PETITION_SIGNATURES_PREFIX, petition_id);
    key.extend_from_slice(&signature_id.to_be_bytes());
    key
}

fn id_suffix(key: &[u8]) -> Option<u64> {
    let tail: [u8; 8] = key.get(key.len().checked_sub(8)?..)?.try_into().ok()?;
    Some(u64::from_be_bytes(tail))
}

/// Outcome of [`PetitionStore::assign_signature_uuid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UuidAssignment {
    Assigned,
    AlreadyPresent,
    /// The record changed between read and write; it is left for a later run.
    Conflict,
}

pub struct PetitionStore {
    instance: Arc<Db>,
}

impl PetitionStore {
    pub fn new(instance: Arc<Db>) -> Self {
        Self { instance }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self::new(Arc::new(db)))
    }

    fn next_id(&self) -> Result<u64, StoreError> {
        // sled ids start at zero, which unsaved records use
        Ok(self.instance.generate_id()? + 1)
    }

    /// Persists a new petition together with its creator signature.
    pub fn create_petition(
        &self,
        mut petition: Petition,
        mut signature: Signature,
    ) -> Result<(Petition, Signature), StoreError> {
        petition.id = self.next_id()?;
        signature.id = self.next_id()?;
        signature.petition_id = petition.id;
        petition.creator_signature_id = Some(signature.id);

        let mut batch = Batch::default();
        batch.insert(
            record_key(PETITION_PREFIX, petition.id),
            minicbor::to_vec(&petition)?,
        );
        batch.insert(
            record_key(SIGNATURE_PREFIX, signature.id),
            minicbor::to_vec(&signature)?,
        );
        batch.insert(index_key(petition.id, signature.id), Vec::<u8>::new());
        self.instance.apply_batch(batch)?;

        debug!(
            petition_id = petition.id,
            signature_id = signature.id,
            "petition created"
        );
        Ok((petition, signature))
    }

    /// Unscoped lookup by id, regardless of state.
    pub fn find_petition(&self, id: u64) -> Result<Petition, StoreError> {
        match self.instance.get(record_key(PETITION_PREFIX, id))? {
            Some(bytes) => Ok(minicbor::decode(&bytes)?),
            None => Err(StoreError::NotFound {
                kind: "Petition",
                id,
            }),
        }
    }

    pub fn find_signature(&self, id: u64) -> Result<Signature, StoreError> {
        match self.instance.get(record_key(SIGNATURE_PREFIX, id))? {
            Some(bytes) => Ok(minicbor::decode(&bytes)?),
            None => Err(StoreError::NotFound {
                kind: "Signature",
                id,
            }),
        }
    }

    pub fn save_petition(&self, petition: &Petition) -> Result<(), StoreError> {
        self.instance.insert(
            record_key(PETITION_PREFIX, petition.id),
            minicbor::to_vec(petition)?,
        )?;
        Ok(())
    }

    pub fn save_signature(&self, signature: &Signature) -> Result<(), StoreError> {
        self.instance.insert(
            record_key(SIGNATURE_PREFIX, signature.id),
            minicbor::to_vec(signature)?,
        )?;
        Ok(())
    }

    /// Every petition in id order, whatever its state.
    pub fn petitions(&self) -> Result<Vec<Petition>, StoreError> {
        self.instance
            .scan_prefix(PETITION_PREFIX)
            .map(|entry| -> Result<Petition, StoreError> {
                let (_, bytes) = entry?;
                Ok(minicbor::decode(&bytes)?)
            })
            .collect()
    }

    pub fn signatures_for_petition(&self, petition_id: u64) -> Result<Vec<Signature>, StoreError> {
        let prefix = record_key(PETITION_SIGNATURES_PREFIX, petition_id);
        let mut signatures = Vec::new();
        for entry in self.instance.scan_prefix(prefix) {
            let (key, _) = entry?;
            if let Some(signature_id) = id_suffix(&key) {
                signatures.push(self.find_signature(signature_id)?);
            }
        }
        Ok(signatures)
    }

    /// Up to `limit` signature records with ids greater than `after`, in id
    /// order. Each record is decoded on its own so one unreadable record does
    /// not hide the rest of the batch.
    pub fn signatures_after(
        &self,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<(u64, Result<Signature, StoreError>)>, StoreError> {
        let start = match after {
            None => record_key(SIGNATURE_PREFIX, 0),
            Some(id) => match id.checked_add(1) {
                Some(next) => record_key(SIGNATURE_PREFIX, next),
                None => return Ok(Vec::new()),
            },
        };
        let mut records = Vec::with_capacity(limit);
        for entry in self.instance.range(start..) {
            let (key, bytes) = entry?;
            if !key.starts_with(SIGNATURE_PREFIX) || records.len() >= limit {
                break;
            }
            let Some(id) = id_suffix(&key) else {
                continue;
            };
            records.push((id, minicbor::decode(&bytes).map_err(StoreError::from)));
        }
        Ok(records)
    }

    /// Sets the uuid of a signature that has none, without overwriting a
    /// value written concurrently.
    pub fn assign_signature_uuid(
        &self,
        signature_id: u64,
        uuid: &str,
    ) -> Result<UuidAssignment, StoreError> {
        let key = record_key(SIGNATURE_PREFIX, signature_id);
        let Some(current) = self.instance.get(&key)? else {
            return Err(StoreError::NotFound {
                kind: "Signature",
                id: signature_id,
            });
        };
        let mut signature: Signature = minicbor::decode(&current)?;
        if signature.uuid.is_some() {
            return Ok(UuidAssignment::AlreadyPresent);
        }
        signature.uuid = Some(uuid.to_string());
        let updated = minicbor::to_vec(&signature)?;

        match self
            .instance
            .compare_and_swap(&key, Some(current), Some(updated))?
        {
            Ok(()) => Ok(UuidAssignment::Assigned),
            Err(_) => Ok(UuidAssignment::Conflict),
        }
    }

    pub fn visible(&self) -> VisiblePetitions<'_> {
        VisiblePetitions { store: self }
    }

    pub fn petition_count(&self) -> usize {
        self.instance.scan_prefix(PETITION_PREFIX).count()
    }

    pub fn signature_count(&self) -> usize {
        self.instance.scan_prefix(SIGNATURE_PREFIX).count()
    }
}

/// Read access restricted to petitions the public may see.
pub struct VisiblePetitions<'a> {
    store: &'a PetitionStore,
}

impl VisiblePetitions<'_> {
    /// Hidden and nonexistent petitions are both reported as not found.
    pub fn find(&self, id: u64) -> Result<Petition, StoreError> {
        let petition = self.store.find_petition(id)?;
        if !petition.is_visible() {
            return Err(StoreError::NotFound {
                kind: "Petition",
                id,
            });
        }
        Ok(petition)
    }

    pub fn all(&self) -> Result<Vec<Petition>, StoreError> {
        let mut petitions = self.store.petitions()?;
        petitions.retain(Petition::is_visible);
        Ok(petitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_sort_by_id() {
        assert!(record_key(SIGNATURE_PREFIX, 2) < record_key(SIGNATURE_PREFIX, 256));
        assert_eq!(id_suffix(&index_key(7, 42)), Some(42));
    }

    #[test]
    fn id_suffix_rejects_short_keys() {
        assert_eq!(id_suffix(b"abc"), None);
    }
}
