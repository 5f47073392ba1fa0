use crate::clock::MonotonicMillis;
use crate::error::*;
use crate::product::{Product, ProductDraft, ProductPatch};
use crate::traits::{AssetStore, CatalogStore, StoredAsset};

use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Entity-level catalog operations on top of a [`CatalogStore`] and an [`AssetStore`].
///
/// Every operation is a full load-mutate-save cycle, so all of them are
/// serialized through one gate; otherwise two concurrent writers would each
/// overwrite the file with their own snapshot and one change would be lost.
#[derive(Clone)]
pub struct CatalogService<C: CatalogStore, A: AssetStore> {
    store: C,
    assets: A,
    gate: Arc<Mutex<()>>,
    ids: Arc<MonotonicMillis>,
}

impl<C: CatalogStore, A: AssetStore> CatalogService<C, A> {
    pub fn new(store: C, assets: A) -> Self {
        Self {
            store,
            assets,
            gate: Arc::new(Mutex::new(())),
            ids: Arc::new(MonotonicMillis::new()),
        }
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        let _guard = self.gate.lock().await;
        Ok(self.store.load_all().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        let _guard = self.gate.lock().await;
        let products = self.store.load_all().await?;
        Ok(products.into_iter().find(|p| p.id == id))
    }

    pub async fn create(&self, draft: ProductDraft) -> Result<Product, CatalogError> {
        let _guard = self.gate.lock().await;
        let mut products = self.store.load_all().await?;

        let id = self.fresh_id(&products);
        let product = draft.into_product(id);
        products.push(product.clone());
        self.store.save_all(&products).await?;

        info!(id = %product.id, title = %product.title, "Product created");
        Ok(product)
    }

    pub async fn update(
        &self,
        id: &str,
        patch: ProductPatch,
    ) -> Result<Option<Product>, CatalogError> {
        let _guard = self.gate.lock().await;
        let mut products = self.store.load_all().await?;

        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        patch.apply(product);
        let updated = product.clone();
        self.store.save_all(&products).await?;

        info!(id, "Product updated");
        Ok(Some(updated))
    }

    /// Removes the product and, if its image is a managed asset, the asset file.
    ///
    /// Returns `false` without side effects when no product has this id.
    pub async fn delete(&self, id: &str) -> Result<bool, CatalogError> {
        let _guard = self.gate.lock().await;
        let mut products = self.store.load_all().await?;

        let Some(index) = products.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        let removed = products.remove(index);
        self.store.save_all(&products).await?;

        if self.assets.is_managed(&removed.image) && self.assets.remove(&removed.image).await {
            info!(id, image = %removed.image, "Deleted product image");
        }

        info!(id, "Product deleted");
        Ok(true)
    }

    pub async fn upload(
        &self,
        data: Bytes,
        file_name: &str,
    ) -> Result<StoredAsset, CatalogError> {
        let stored = self.assets.store(data, file_name).await?;
        info!(url = %stored.url, "Asset stored");
        Ok(stored)
    }

    fn fresh_id(&self, existing: &[Product]) -> String {
        let taken: HashSet<&str> = existing.iter().map(|p| p.id.as_str()).collect();
        loop {
            let candidate = self.ids.next().to_string();
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Clone, Default)]
    struct MemoryStore {
        products: Arc<StdMutex<Vec<Product>>>,
    }

    impl CatalogStore for MemoryStore {
        async fn load_all(&self) -> Result<Vec<Product>, StoreError> {
            Ok(self.products.lock().unwrap().clone())
        }

        async fn save_all(&self, products: &[Product]) -> Result<(), StoreError> {
            *self.products.lock().unwrap() = products.to_vec();
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryAssets {
        removed: Arc<StdMutex<Vec<String>>>,
    }

    impl AssetStore for MemoryAssets {
        async fn store(&self, _data: Bytes, name: &str) -> Result<StoredAsset, AssetError> {
            Ok(StoredAsset {
                url: format!("/products/{name}"),
                file_name: name.to_string(),
            })
        }

        async fn remove(&self, reference: &str) -> bool {
            self.removed.lock().unwrap().push(reference.to_string());
            true
        }

        fn is_managed(&self, reference: &str) -> bool {
            reference.starts_with("/products/")
        }
    }

    fn service() -> CatalogService<MemoryStore, MemoryAssets> {
        CatalogService::new(MemoryStore::default(), MemoryAssets::default())
    }

    #[tokio::test]
    async fn create_assigns_id_and_round_trips() {
        let service = service();
        let draft = ProductDraft {
            categories: vec!["c1".into(), "c2".into()],
            ..ProductDraft::new("A", "d", "/products/x.jpg")
        };

        let created = service.create(draft.clone()).await.unwrap();
        assert!(!created.id.is_empty());
        assert!(created.show_on_homepage);

        let fetched = service.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, draft.into_product(created.id.clone()));
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let service = service();
        let mut ids = HashSet::new();
        for i in 0..50 {
            let product = service
                .create(ProductDraft::new(format!("p{i}"), "d", "/x.jpg"))
                .await
                .unwrap();
            assert!(ids.insert(product.id));
        }
    }

    #[tokio::test]
    async fn fresh_id_skips_ids_already_on_disk() {
        let service = service();
        let future_id = (chrono::Utc::now().timestamp_millis() + 5).to_string();
        let existing = ProductDraft::new("old", "d", "/x.jpg").into_product(future_id.clone());
        service.store.save_all(&[existing]).await.unwrap();

        for _ in 0..10 {
            let product = service
                .create(ProductDraft::new("new", "d", "/x.jpg"))
                .await
                .unwrap();
            assert_ne!(product.id, future_id);
        }
    }

    #[tokio::test]
    async fn concurrent_creates_are_not_lost() {
        let service = service();
        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create(ProductDraft::new(format!("p{i}"), "d", "/x.jpg"))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(service.list().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn update_missing_returns_none() {
        let service = service();
        let result = service.update("nope", ProductPatch::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let service = service();
        let created = service
            .create(ProductDraft {
                categories: vec!["a".into()],
                ..ProductDraft::new("A", "d", "/x.jpg")
            })
            .await
            .unwrap();

        let patch = ProductPatch {
            title: Some("T".into()),
            ..Default::default()
        };
        let updated = service.update(&created.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "T");
        assert_eq!(updated.categories, created.categories);
        assert_eq!(service.get(&created.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn delete_cascades_only_to_managed_assets() {
        let service = service();
        let managed = service
            .create(ProductDraft::new("A", "d", "/products/x.jpg"))
            .await
            .unwrap();
        let external = service
            .create(ProductDraft::new("B", "d", "https://cdn.example.com/y.jpg"))
            .await
            .unwrap();

        assert!(service.delete(&managed.id).await.unwrap());
        assert!(service.delete(&external.id).await.unwrap());
        assert!(!service.delete(&external.id).await.unwrap());

        assert!(service.list().await.unwrap().is_empty());
        assert_eq!(
            *service.assets.removed.lock().unwrap(),
            vec!["/products/x.jpg".to_string()]
        );
    }
}
