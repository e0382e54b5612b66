//! Per-brand persistence of the name-based mapping.

use crate::host::ClientStorage;
use gf_core::mapping::Mapping;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode storage: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("could not decode storage: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("could not encode mapping: {0}")]
    Mapping(#[from] serde_json::Error),
}

/// Saves and loads mappings under `{namespace}:mappings:{brand}`.
pub struct MappingStore<S> {
    storage: S,
    namespace: String,
}

impl<S: ClientStorage> MappingStore<S> {
    pub fn new(storage: S, namespace: &str) -> Self {
        Self {
            storage,
            namespace: namespace.to_string(),
        }
    }

    pub fn key(&self, brand: &str) -> String {
        format!("{}:mappings:{brand}", self.namespace)
    }

    /// Store `mapping` for `brand`, replacing any previous one.
    pub async fn save(&mut self, brand: &str, mapping: &Mapping) -> Result<(), StoreError> {
        let key = self.key(brand);
        self.storage.set(&key, serde_json::to_value(mapping)?).await?;
        log::info!("saved mapping {key}");
        Ok(())
    }

    /// The mapping stored for `brand`, if any.
    ///
    /// A stored value that no longer decodes as a mapping counts as absent.
    pub async fn load(&self, brand: &str) -> Result<Option<Mapping>, StoreError> {
        let key = self.key(brand);
        let Some(value) = self.storage.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(mapping) => Ok(Some(mapping)),
            Err(e) => {
                log::warn!("ignoring unreadable mapping at {key}: {e}");
                Ok(None)
            }
        }
    }

    pub async fn load_or_default(&self, brand: &str) -> Result<Mapping, StoreError> {
        Ok(self.load(brand).await?.unwrap_or_default())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use pretty_assertions::assert_eq;

    fn store() -> MappingStore<MemoryStorage> {
        MappingStore::new(MemoryStorage::new(), "gridfill")
    }

    #[tokio::test]
    async fn round_trip() {
        let mut store = store();
        let mapping = Mapping {
            title_node: "Name".into(),
            meta_node: "Details".into(),
            poster_node: "Art".into(),
        };
        store.save("tcm", &mapping).await.unwrap();
        assert_eq!(store.load("tcm").await.unwrap(), Some(mapping));
    }

    #[tokio::test]
    async fn unknown_brand_is_none() {
        let store = store();
        assert_eq!(store.load("hbo").await.unwrap(), None);
        assert_eq!(store.load_or_default("hbo").await.unwrap(), Mapping::default());
    }

    #[tokio::test]
    async fn brands_do_not_share_keys() {
        let mut store = store();
        store.save("dc", &Mapping::default()).await.unwrap();
        assert_eq!(store.load("DC").await.unwrap(), None);
        assert_eq!(store.key("dc"), "gridfill:mappings:dc");
    }

    #[tokio::test]
    async fn unreadable_value_is_absent() {
        let mut storage = MemoryStorage::new();
        storage
            .set("gridfill:mappings:max", serde_json::json!("not a mapping"))
            .await
            .unwrap();
        let store = MappingStore::new(storage, "gridfill");
        assert_eq!(store.load("max").await.unwrap(), None);
    }
}
