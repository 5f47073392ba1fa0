use showcase_core::prelude::*;

#[derive(Clone)]
pub struct AppState<C: CatalogStore, A: AssetStore, D: Deployer> {
    pub catalog: CatalogService<C, A>,
    pub trigger: DeployTrigger<D>,
    pub logs: LogReader,
}
