use anyhow::Context;
use clap::{Parser, Subcommand};
use log::debug;
use opdrape_api::{Credentials, FileStore, ProductQuery};
use opdrape_storefront::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(name = "storefront", version)]
#[clap(about = "Command line client for the OpDrape storefront", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// API root. Defaults to STOREFRONT_API_URL, then http://localhost:8000/api
    #[clap(long)]
    api_url: Option<String>,

    /// File holding the session between runs
    #[clap(long, default_value = ".storefront-session.json")]
    state_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and keep the session in the state file
    Login {
        #[clap(long)]
        email: String,
        /// Read from STOREFRONT_PASSWORD when omitted
        #[clap(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged in user
    Whoami,
    /// List products
    Products {
        #[clap(long, conflicts_with = "tag")]
        category: Option<String>,
        /// Banner tag such as new-arrivals or best-sellers
        #[clap(long)]
        tag: Option<String>,
        #[clap(long, default_value = "1")]
        page: u32,
    },
    /// Show the wishlist
    Wishlist,
    /// Add a product to the wishlist, or remove it if already there
    Toggle { product_id: String },
    /// Empty the cart
    ClearCart,
    /// Ask the shopping assistant
    Chat { message: String },
}

async fn run() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = StorefrontConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.parse().with_context(|| format!("Invalid API URL: {}", url))?;
    }

    let storage = FileStore::open(&cli.state_file)
        .await
        .with_context(|| format!("Failed to open {}", cli.state_file.display()))?;
    debug!("session file {}", storage.path().display());
    let storefront =
        Storefront::with_storage(config.api_url.as_str(), config.options, Arc::new(storage))?;
    let store = storefront.store();

    match cli.command {
        Commands::Login { email, password } => {
            let password = password
                .or_else(|| std::env::var("STOREFRONT_PASSWORD").ok())
                .context("No password given; pass --password or set STOREFRONT_PASSWORD")?;
            let user = store
                .sign_in(&Credentials::new(&email, &password))
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Logged in as {}", user.display_name());
        }
        Commands::Logout => {
            store.logout().await;
            println!("Logged out");
        }
        Commands::Whoami => {
            let state = store.bootstrap().await;
            match state.user {
                Some(user) if state.is_authenticated => {
                    let role = if user.has_admin_rights() { " (admin)" } else { "" };
                    println!("{}{}", user.display_name(), role);
                }
                _ => println!("Not logged in"),
            }
        }
        Commands::Products {
            category,
            tag,
            page,
        } => {
            let query = ProductQuery::new().page(page);
            let products = storefront.api().products();
            let listing = match (category, tag) {
                (Some(category), _) => products.by_category(&category, &query).await?,
                (None, Some(tag)) => products.by_tag(&tag, &query).await?,
                (None, None) => products.list(&query).await?,
            };
            for product in &listing.products {
                println!(
                    "{:<26} {:>9.2}  {}",
                    product.id().unwrap_or("-"),
                    product.effective_price(),
                    product.name
                );
            }
            println!(
                "page {} of {} ({} products)",
                listing.page, listing.total_pages, listing.total
            );
        }
        Commands::Wishlist => {
            let state = store.bootstrap().await;
            if !state.is_authenticated {
                anyhow::bail!("Please log in");
            }
            for item in &state.wishlist {
                println!(
                    "{:<26} {}",
                    item.product_id().unwrap_or("-"),
                    item.name.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Toggle { product_id } => {
            store.bootstrap().await;
            let result = store.toggle_wishlist(&product_id).await;
            if !result.success {
                anyhow::bail!(result.message);
            }
            println!("{}", result.message);
        }
        Commands::ClearCart => {
            let outcome = storefront.api().cart().clear().await;
            println!("{}", outcome.message);
        }
        Commands::Chat { message } => {
            let reply = storefront.assistant().send_message(&message, &[]).await?;
            println!("{}", reply.message);
            for card in &reply.products {
                match card.display_price() {
                    Some(price) => println!("  - {} ({:.2})", card.name, price),
                    None => println!("  - {}", card.name),
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
