//! Key-addressed JSON store.
//!
//! Entities live under `"<kind>:<id>"` keys, serialized as JSON. Single-key
//! calls are atomic on their own; anything touching more than one key goes
//! through [`Store::transaction`] (writes) or [`Store::view`] (reads).

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

type Data = HashMap<String, Vec<u8>>;

#[derive(Default)]
pub struct Store {
    data: RwLock<Data>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        decode(&data, key)
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.transaction(|tx| tx.set_json(key, value))
    }

    pub fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.contains_key(key))
    }

    /// Consistent read across several keys. No writer can commit while `f` runs.
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Snapshot<'_>) -> Result<T, E>,
    {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        f(&Snapshot { data: &*data })
    }

    /// Atomic read-modify-write across any number of keys.
    ///
    /// Writers are serialized. Writes made through the [`Transaction`] are
    /// staged and applied together only when `f` returns `Ok`; an `Err` (or a
    /// panic) leaves the store exactly as it was.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    {
        // Staged writes are never visible before commit, so a panic inside `f`
        // cannot leave partial state behind and the poison flag can be ignored.
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);

        let (result, writes) = {
            let mut tx = Transaction {
                base: &*data,
                writes: HashMap::new(),
            };
            let result = f(&mut tx);
            (result, tx.writes)
        };

        let value = result?;
        for (key, write) in writes {
            match write {
                Some(bytes) => {
                    data.insert(key, bytes);
                }
                None => {
                    data.remove(&key);
                }
            }
        }
        Ok(value)
    }
}

pub struct Snapshot<'a> {
    data: &'a Data,
}

impl Snapshot<'_> {
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        decode(self.data, key)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}

pub struct Transaction<'a> {
    base: &'a Data,
    writes: HashMap<String, Option<Vec<u8>>>,
}

impl Transaction<'_> {
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.writes.get(key) {
            Some(Some(bytes)) => serde_json::from_slice(bytes)
                .map(Some)
                .with_context(|| format!("corrupt value at {}", key)),
            Some(None) => Ok(None),
            None => decode(self.base, key),
        }
    }

    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(value).with_context(|| format!("encode {}", key))?;
        self.writes.insert(key.to_string(), Some(bytes));
        Ok(())
    }

    pub fn delete(&mut self, key: &str) {
        self.writes.insert(key.to_string(), None);
    }

    pub fn exists(&self, key: &str) -> bool {
        match self.writes.get(key) {
            Some(write) => write.is_some(),
            None => self.base.contains_key(key),
        }
    }
}

fn decode<T: DeserializeOwned>(data: &Data, key: &str) -> anyhow::Result<Option<T>> {
    data.get(key)
        .map(|bytes| serde_json::from_slice(bytes))
        .transpose()
        .with_context(|| format!("corrupt value at {}", key))
}
