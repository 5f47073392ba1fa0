pub use showcase_core::*;

#[cfg(feature = "server")]
pub mod server {
    pub use showcase_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use showcase_client::*;
}

#[cfg(feature = "fs")]
pub mod fs {
    pub use showcase_fs::*;
}

#[cfg(feature = "deploy")]
pub mod deploy_shell {
    pub use showcase_deploy::*;
}

#[cfg(feature = "mock_deploy")]
pub mod deploy_mock {
    pub use showcase_deploy_mock::*;
}

pub mod prelude {
    pub use showcase_core::prelude::*;

    #[cfg(feature = "server")]
    pub use showcase_server::prelude::*;

    #[cfg(feature = "client")]
    pub use showcase_client::ShowcaseClient;

    #[cfg(feature = "fs")]
    pub use showcase_fs::{CorruptCatalogPolicy, FileSystemAssets, JsonCatalogStore};

    #[cfg(feature = "deploy")]
    pub use showcase_deploy::{ShellDeployer, ShellDeployerConfig};

    #[cfg(feature = "mock_deploy")]
    pub use showcase_deploy_mock::RecordingDeployer;
}
