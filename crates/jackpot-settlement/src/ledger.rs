//! Transaction ledger: durable, append-only, keyed by idempotency key.
//!
//! `append` never overwrites: if a record already exists for the key, the
//! existing record is returned and the new one is dropped. That makes a
//! retried append safe.
//!
//! Two implementations ship with the crate:
//! - [`InMemoryLedger`] for tests and embedded use
//! - [`FileLedger`], one JSON line per record with a SHA-256 digest, synced to
//!   disk on every append and re-verified when the file is opened

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use jackpot_types::{IdempotencyKey, JackpotError, Result, TransactionRecord};
use serde::{Deserialize, Serialize};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};

#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Append `record` unless its key is already present.
    ///
    /// Returns the previously stored record when the key exists.
    async fn append(&self, record: TransactionRecord) -> Result<Option<TransactionRecord>>;

    /// Look up a record by key.
    async fn get(&self, key: &IdempotencyKey) -> Result<Option<TransactionRecord>>;
}

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    records: HashMap<IdempotencyKey, TransactionRecord>,
    /// Append order.
    order: Vec<IdempotencyKey>,
}

/// Process-local ledger.
#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<MemoryState>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records in append order.
    pub fn records(&self) -> Vec<TransactionRecord> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .order
            .iter()
            .filter_map(|key| state.records.get(key).cloned())
            .collect()
    }
}

#[async_trait]
impl TransactionLedger for InMemoryLedger {
    async fn append(&self, record: TransactionRecord) -> Result<Option<TransactionRecord>> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = state.records.get(&record.idempotency_key) {
            return Ok(Some(existing.clone()));
        }
        state.order.push(record.idempotency_key.clone());
        state.records.insert(record.idempotency_key.clone(), record);
        Ok(None)
    }

    async fn get(&self, key: &IdempotencyKey) -> Result<Option<TransactionRecord>> {
        Ok(self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .get(key)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// FileLedger
// ---------------------------------------------------------------------------

/// On-disk line format.
#[derive(Serialize, Deserialize)]
struct LedgerLine {
    digest: String,
    record: TransactionRecord,
}

struct FileState {
    file: File,
    index: HashMap<IdempotencyKey, TransactionRecord>,
}

/// JSON-lines ledger file. Appends are serialised and `fsync`ed.
pub struct FileLedger {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileLedger {
    /// Open (or create) the ledger at `path`, loading and verifying every
    /// existing record.
    ///
    /// # Errors
    /// - `Io` if the file cannot be read or opened for append
    /// - `Serialization` if a line is malformed or its digest does not match
    ///
    /// An unparseable final line with no trailing newline is a torn write; it
    /// is truncated away rather than failing the open.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut index = HashMap::new();

        let mut torn_at = None;
        let mut unterminated = false;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                unterminated = !contents.is_empty() && !contents.ends_with('\n');
                let mut offset = 0u64;
                let mut lines = contents.split_inclusive('\n').enumerate().peekable();
                while let Some((n, raw)) = lines.next() {
                    let start = offset;
                    offset += raw.len() as u64;
                    let line = raw.trim_end_matches('\n');
                    if line.trim().is_empty() {
                        continue;
                    }
                    let entry: LedgerLine = match serde_json::from_str(line) {
                        Ok(entry) => entry,
                        // An unterminated last line is a write cut short by a
                        // crash; anything earlier is real corruption.
                        Err(e) if lines.peek().is_none() && !raw.ends_with('\n') => {
                            tracing::warn!(
                                path = %path.display(),
                                line = n + 1,
                                error = %e,
                                "Discarding torn ledger tail"
                            );
                            torn_at = Some(start);
                            break;
                        }
                        Err(e) => {
                            return Err(JackpotError::Serialization(format!(
                                "ledger line {}: {e}",
                                n + 1
                            )));
                        }
                    };
                    if entry.record.digest()? != entry.digest {
                        return Err(JackpotError::Serialization(format!(
                            "ledger line {}: digest mismatch for {}",
                            n + 1,
                            entry.record.idempotency_key
                        )));
                    }
                    index
                        .entry(entry.record.idempotency_key.clone())
                        .or_insert(entry.record);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        if let Some(len) = torn_at {
            file.set_len(len).await?;
        } else if unterminated {
            write_synced(&mut file, b"\n").await?;
        }

        tracing::info!(
            path = %path.display(),
            records = index.len(),
            "Ledger opened"
        );

        Ok(Self {
            path,
            state: Mutex::new(FileState { file, index }),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.state.lock().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TransactionLedger for FileLedger {
    async fn append(&self, record: TransactionRecord) -> Result<Option<TransactionRecord>> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.index.get(&record.idempotency_key) {
            return Ok(Some(existing.clone()));
        }

        let line = LedgerLine {
            digest: record.digest()?,
            record,
        };
        let mut bytes = serde_json::to_vec(&line)?;
        bytes.push(b'\n');
        let len_before = state.file.metadata().await?.len();
        if let Err(err) = write_synced(&mut state.file, &bytes).await {
            // Leave no partial line behind for the next append to run into.
            if let Err(truncate_err) = state.file.set_len(len_before).await {
                tracing::error!(
                    path = %self.path.display(),
                    error = %truncate_err,
                    "Could not roll back partial ledger write"
                );
            }
            return Err(err.into());
        }

        let LedgerLine { record, .. } = line;
        state.index.insert(record.idempotency_key.clone(), record);
        Ok(None)
    }

    async fn get(&self, key: &IdempotencyKey) -> Result<Option<TransactionRecord>> {
        Ok(self.state.lock().await.index.get(key).cloned())
    }
}

/// Write and sync `bytes`. The flush surfaces errors from tokio's background
/// write, which `sync_data` alone would not report.
async fn write_synced(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await
}
