use showcase::prelude::*;
use std::env;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Providers
    let store = JsonCatalogStore::new("./showcase_data/products.json");
    let assets = FileSystemAssets::new("./showcase_data/public");

    // Records deploys instead of running a script. Use ShellDeployer for real deployments.
    let deployer = RecordingDeployer::new();

    // Build App
    let app = ShowcaseServer::new(ShowcaseServerConfig {
        webhook_secret: env::var("GITHUB_WEBHOOK_SECRET").ok(),
        // Manual pushes are refused unless explicitly in development.
        environment: Environment::Development,
        ..Default::default()
    })
    .build(store, assets, deployer);

    // Serve
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");
    println!("Server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
