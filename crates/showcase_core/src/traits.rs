use crate::deploy::{LaunchReceipt, PushReport};
use crate::error::*;
use crate::product::Product;

use bytes::Bytes;

/// Whole-collection persistence for the catalog.
///
/// Implementations never write partially: `save_all` replaces everything at once.
pub trait CatalogStore: Send + Sync + 'static + Clone {
    /// A missing backing file is an empty catalog, not an error.
    fn load_all(&self) -> impl Future<Output = Result<Vec<Product>, StoreError>> + Send;
    fn save_all(
        &self,
        products: &[Product],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// A file stored by [`AssetStore::store`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAsset {
    /// Public reference, e.g. `/products/product-1718000000000.jpg`.
    pub url: String,
    pub file_name: String,
}

pub trait AssetStore: Send + Sync + 'static + Clone {
    fn store(
        &self,
        data: Bytes,
        suggested_name: &str,
    ) -> impl Future<Output = Result<StoredAsset, AssetError>> + Send;

    /// Deletes the file behind `reference` if it is a managed asset.
    ///
    /// Returns whether a file was removed. A missing file is not an error and
    /// any other failure is logged, never propagated.
    fn remove(&self, reference: &str) -> impl Future<Output = bool> + Send;

    fn is_managed(&self, reference: &str) -> bool;
}

pub trait Deployer: Send + Sync + 'static + Clone {
    /// Starts the deploy script and returns as soon as it is running.
    fn launch(&self) -> impl Future<Output = Result<LaunchReceipt, DeployError>> + Send;

    /// Stages, commits and pushes the working tree.
    fn push(&self) -> impl Future<Output = Result<PushReport, DeployError>> + Send;
}
