//! Learned character-form history.
//!
//! Responsibilities implemented here:
//! - `InMemoryFormHistory`: thread-safe map from group key to the last
//!   concrete form the user chose for that group.
//! - `RedbFormHistory`: the same map persisted with `redb`; every mutation,
//!   including a batch of entries, is committed in one write transaction.
//! - `FormHistory` enum: backend switch used by `CharacterFormManager`.
//!
//! A missing key means "no history", never an error.
use crate::width::FormType;
use anyhow::Result;
use redb::{ReadableTable, TableDefinition};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// In-memory history, shared by clones.
#[derive(Clone, Debug, Default)]
pub struct InMemoryFormHistory {
    inner: Arc<RwLock<HashMap<String, FormType>>>,
}

impl InMemoryFormHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_many(&self, entries: &[(String, FormType)]) {
        if let Ok(mut map) = self.inner.write() {
            for (key, form) in entries {
                map.insert(key.clone(), *form);
            }
        }
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }

    pub fn snapshot(&self) -> HashMap<String, FormType> {
        if let Ok(map) = self.inner.read() {
            map.clone()
        } else {
            HashMap::new()
        }
    }
}

/// Redb-backed history.
pub struct RedbFormHistory {
    db: redb::Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbFormHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbFormHistory")
            .field("path", &self.path)
            .finish()
    }
}

impl RedbFormHistory {
    /// Group key -> form (1 = half width, 2 = full width).
    pub const TABLE_DEF: TableDefinition<'static, &'static str, u8> =
        TableDefinition::new("character_form_history");

    /// Create or open a history database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = redb::Database::create(path.as_ref())?;
        // Create the table up front so readers never see it missing.
        let write_txn = db.begin_write()?;
        write_txn.open_table(Self::TABLE_DEF)?;
        write_txn.commit()?;
        Ok(Self {
            db,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Write every entry in one transaction; on error nothing is stored.
    pub fn set_many(&self, entries: &[(String, FormType)]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(Self::TABLE_DEF)?;
            for (key, form) in entries {
                table.insert(key.as_str(), form.to_u8())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(Self::TABLE_DEF)?;
        write_txn.open_table(Self::TABLE_DEF)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn snapshot(&self) -> Result<HashMap<String, FormType>> {
        let mut out = HashMap::new();
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(Self::TABLE_DEF) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        for item in table.iter()? {
            let (k, v) = item?;
            if let Some(form) = FormType::from_u8(v.value()) {
                out.insert(k.value().to_string(), form);
            }
        }
        Ok(out)
    }
}

/// Backend switch for the learned form history.
#[derive(Clone, Debug)]
pub enum FormHistory {
    InMemory(InMemoryFormHistory),
    Redb(Arc<RedbFormHistory>),
}

impl Default for FormHistory {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

impl FormHistory {
    pub fn new_in_memory() -> Self {
        FormHistory::InMemory(InMemoryFormHistory::new())
    }

    /// Open (or create) a persisted history at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(FormHistory::Redb(Arc::new(RedbFormHistory::new(path)?)))
    }

    /// Record all `entries` at once, flushing persisted backends
    /// immediately. Either every entry is stored or none is.
    pub fn set_many(&self, entries: &[(String, FormType)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        match self {
            FormHistory::InMemory(m) => {
                m.set_many(entries);
                Ok(())
            }
            FormHistory::Redb(r) => {
                r.set_many(entries)?;
                tracing::debug!("stored {} form history entries", entries.len());
                Ok(())
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        match self {
            FormHistory::InMemory(m) => {
                m.clear();
                Ok(())
            }
            FormHistory::Redb(r) => r.clear(),
        }
    }

    pub fn snapshot(&self) -> Result<HashMap<String, FormType>> {
        match self {
            FormHistory::InMemory(m) => Ok(m.snapshot()),
            FormHistory::Redb(r) => r.snapshot(),
        }
    }
}
