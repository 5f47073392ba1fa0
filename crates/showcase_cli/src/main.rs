use clap::{Args, Parser, Subcommand};
use rand::Rng;
use rand::distr::Alphanumeric;
use showcase_client::ShowcaseClient;
use showcase_core::prelude::*;
use showcase_deploy::{ShellDeployer, ShellDeployerConfig};
use showcase_fs::{CorruptCatalogPolicy, FileSystemAssets, JsonCatalogStore};
use showcase_server::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "showcase")]
#[command(about = "Product catalog server and admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server URL
    #[arg(short, long, default_value = "http://localhost:3000", env = "SHOWCASE_URL")]
    url: String,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Directory holding `products.json`
    #[arg(long, env = "SHOWCASE_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Public directory; images are stored under `<public>/products`
    #[arg(long, env = "SHOWCASE_PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,

    /// Treat an unreadable catalog file as empty instead of failing
    #[arg(long)]
    lenient_catalog: bool,

    #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: Option<String>,

    /// `development` enables POST /deploy/push
    #[arg(long, env = "SHOWCASE_ENV", default_value = "production")]
    environment: Environment,

    #[arg(long, env = "SHOWCASE_BRANCH", default_value = "master")]
    branch: String,

    #[arg(long, env = "SHOWCASE_REMOTE", default_value = "origin")]
    remote: String,

    /// Working tree for git and the deploy script
    #[arg(long, env = "SHOWCASE_REPO_DIR", default_value = ".")]
    repo_dir: PathBuf,

    #[arg(long, env = "SHOWCASE_DEPLOY_SCRIPT", default_value = "scripts/deploy.sh")]
    deploy_script: PathBuf,

    /// Deploy log directory, relative to the repo dir
    #[arg(long, env = "SHOWCASE_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Timeout for each git command, in seconds
    #[arg(long, default_value_t = 120)]
    git_timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// List all products
    List,
    /// Show a single product
    Get { id: String },
    /// Create a product
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Image reference, e.g. the url returned by `upload`
        #[arg(long)]
        image: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
        #[arg(long)]
        brand: Option<String>,
        /// Do not show on the homepage
        #[arg(long)]
        hidden: bool,
    },
    /// Update fields of a product
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long, value_delimiter = ',')]
        categories: Option<Vec<String>>,
        #[arg(long)]
        show_on_homepage: Option<bool>,
    },
    /// Delete a product and its uploaded image
    Delete { id: String },
    /// Upload an image
    Upload { path: PathBuf },
    /// Commit and push the working tree (development servers only)
    Push,
    /// List deploy logs, or print one
    Logs { file: Option<String> },
    /// Generate a webhook secret
    GenerateSecret,
    /// Print the signature header value for a payload file
    Sign {
        payload: PathBuf,
        #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Send a signed webhook payload to the server
    Webhook {
        payload: PathBuf,
        #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,
    },
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let policy = if args.lenient_catalog {
        CorruptCatalogPolicy::TreatAsEmpty
    } else {
        CorruptCatalogPolicy::Fail
    };
    let store =
        JsonCatalogStore::new(args.data_dir.join("products.json")).with_corrupt_policy(policy);
    let assets = FileSystemAssets::new(&args.public_dir);
    let deployer = ShellDeployer::new(ShellDeployerConfig {
        repo_dir: args.repo_dir,
        script: args.deploy_script,
        log_dir: args.log_dir,
        remote: args.remote,
        branch: args.branch.clone(),
        command_timeout: Duration::from_secs(args.git_timeout),
        ..Default::default()
    });

    let app = ShowcaseServer::new(ShowcaseServerConfig {
        webhook_secret: args.webhook_secret,
        environment: args.environment,
        target_branch: args.branch,
        log_dir: deployer.log_dir(),
        ..Default::default()
    })
    .build(store, assets, deployer);

    let addr = format!("0.0.0.0:{}", args.port);
    info!(environment = %args.environment, "Server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let client = ShowcaseClient::new(cli.url.clone());

    match cli.command {
        Commands::Serve(args) => serve(args).await?,
        Commands::List => {
            let products = client.list_products().await?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
        Commands::Get { id } => {
            let product = client.get_product(&id).await?;
            println!("{}", serde_json::to_string_pretty(&product)?);
        }
        Commands::Create {
            title,
            description,
            image,
            date,
            categories,
            brand,
            hidden,
        } => {
            let draft = ProductDraft {
                date,
                categories,
                brand,
                show_on_homepage: !hidden,
                ..ProductDraft::new(title, description, image)
            };
            let product = client.create_product(&draft).await?;
            println!("✅ Created product {}", product.id);
        }
        Commands::Update {
            id,
            title,
            description,
            image,
            categories,
            show_on_homepage,
        } => {
            let patch = ProductPatch {
                title,
                description,
                image,
                categories,
                show_on_homepage,
                ..Default::default()
            };
            let product = client.update_product(&id, &patch).await?;
            println!("{}", serde_json::to_string_pretty(&product)?);
        }
        Commands::Delete { id } => {
            client.delete_product(&id).await?;
            println!("🗑️  Deleted product {id}");
        }
        Commands::Upload { path } => {
            let asset = client.upload_file(&path).await?;
            println!("✅ Upload successful! Url: {}", asset.url);
        }
        Commands::Push => {
            let report = client.push().await?;
            if !report.committed {
                println!("Nothing to commit.");
            }
            println!("🚀 Pushed: {}", report.commit_message);
            print!("{}", report.output);
        }
        Commands::Logs { file: Some(file) } => {
            print!("{}", client.read_log(&file).await?);
        }
        Commands::Logs { file: None } => {
            let list = client.list_logs().await?;
            if list.logs.is_empty() {
                println!("No deploy logs yet.");
            }
            for log in list.logs {
                println!("{log}");
            }
        }
        Commands::GenerateSecret => {
            let secret: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(64)
                .map(char::from)
                .collect();

            println!("🔑 Generated webhook secret:");
            println!("\n    {secret}\n");
            println!("Set it on the server and in the repository's webhook settings:");
            println!("set GITHUB_WEBHOOK_SECRET=\"{secret}\"");
        }
        Commands::Sign { payload, secret } => {
            let body = tokio::fs::read(&payload).await?;
            println!("{SIGNATURE_HEADER}: {}", sign(&secret, &body));
        }
        Commands::Webhook { payload, secret } => {
            let body = tokio::fs::read(&payload).await?;
            let signature = sign(&secret, &body);
            let response = client.send_webhook(body, &signature).await?;
            println!("{} (branch: {})", response.message, response.branch);
        }
    }

    Ok(())
}
