//! Append-only, hash-chained audit log.
//!
//! Each entry commits to its predecessor:
//! `hash = SHA-256(domain || sequence || prev_hash || event fields)`.
//! Entries are never mutated or removed; [`AuditLog::verify_chain`]
//! recomputes every link.

use sha2::{Digest, Sha256};
use tokensale_types::{AuditEntry, RecordId, Result, SaleError, SaleEvent};

#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return the sealed entry.
    pub fn append(&mut self, event: SaleEvent) -> AuditEntry {
        let sequence = self.entries.len() as u64;
        let prev_hash = self.head();
        let hash = Self::compute_hash(sequence, &prev_hash, &event);
        let entry = AuditEntry {
            sequence,
            id: RecordId::new(),
            event,
            prev_hash,
            hash,
        };
        self.entries.push(entry.clone());
        entry
    }

    /// Hash of the latest entry; all zeros while empty.
    #[must_use]
    pub fn head(&self) -> [u8; 32] {
        self.entries.last().map_or([0u8; 32], |e| e.hash)
    }

    #[must_use]
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recompute every link.
    ///
    /// # Errors
    /// [`SaleError::AuditChainBroken`] at the first entry that does not verify.
    pub fn verify_chain(&self) -> Result<()> {
        Self::verify_entries(&self.entries)
    }

    /// Verify an exported slice of entries, e.g. one handed to an observer.
    pub fn verify_entries(entries: &[AuditEntry]) -> Result<()> {
        let mut prev = [0u8; 32];
        for (i, entry) in entries.iter().enumerate() {
            let expected = Self::compute_hash(entry.sequence, &prev, &entry.event);
            if entry.sequence != i as u64 || entry.prev_hash != prev || entry.hash != expected {
                return Err(SaleError::AuditChainBroken {
                    sequence: i as u64,
                });
            }
            prev = entry.hash;
        }
        Ok(())
    }

    /// One JSON object per line, oldest first.
    pub fn export_jsonl(&self) -> Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }

    fn compute_hash(sequence: u64, prev_hash: &[u8; 32], event: &SaleEvent) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"tokensale:audit:v1:");
        hasher.update(sequence.to_le_bytes());
        hasher.update(prev_hash);
        hasher.update(event.kind().as_bytes());
        hasher.update(event.timestamp().timestamp_micros().to_le_bytes());

        match event {
            SaleEvent::Settlement(r) => {
                hasher.update(r.buyer.as_bytes());
                hasher.update(r.deposit_amount.to_le_bytes());
                hasher.update(r.payout_amount.to_le_bytes());
                hasher.update(r.treasury_amount.to_le_bytes());
                hasher.update(r.development_amount.to_le_bytes());
            }
            SaleEvent::Recovery(r) => {
                hasher.update(r.destination.as_bytes());
                hasher.update(r.amount.to_le_bytes());
            }
            SaleEvent::Pause(r) => {
                hasher.update(r.account.as_bytes());
                hasher.update([u8::from(r.paused)]);
            }
            SaleEvent::Role(r) => {
                hasher.update(r.role.0);
                hasher.update(r.account.as_bytes());
                hasher.update(r.sender.as_bytes());
                hasher.update([u8::from(r.granted)]);
            }
        }

        hasher.finalize().into()
    }
}
