// ============================================================================
// storefront — terminal front end for the catalog and cart stores
// ============================================================================
// Usage:
//   storefront list [--category CAT]               List (filtered) catalog items
//   storefront categories                          List distinct categories
//   storefront create --name N --brand B ...       Create a catalog item
//   storefront update ID [--price P] [--stock S]   Edit a catalog item
//   storefront delete ID                           Delete a catalog item
//   storefront cart --add ID[:QTY] [--set ID:QTY] [--remove ID]
//                                                  Build a cart, print the total
//
// Global flags: --api-url URL, --offline (seeded in-memory catalog), -v
// ============================================================================

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand};
use parking_lot::Mutex;
use storefront_core::{
    CatalogItem, CategoryFilter, ItemDraft, MemoryCatalogGateway, Storefront, StorefrontConfig,
    Subscription,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Catalog and shopping-cart manager
#[derive(Parser)]
#[command(name = "storefront", version, about = "Browse and edit the catalog, build a cart")]
struct Cli {
    /// Catalog collection URL (default: STOREFRONT_API_URL or http://localhost:3000/articles)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Use a built-in sample catalog instead of the remote one
    #[arg(long, global = true)]
    offline: bool,

    /// Log store activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog items, optionally filtered by category
    List {
        /// Category to show ("all" shows everything, case-insensitive)
        #[arg(long, default_value = "all")]
        category: String,
    },

    /// List the distinct categories present in the catalog
    Categories,

    /// Create a catalog item
    Create(CreateArgs),

    /// Edit fields of an existing catalog item
    Update(UpdateArgs),

    /// Delete a catalog item
    Delete {
        /// Item id
        id: String,
    },

    /// Fill a cart from the catalog and print its lines and total
    Cart {
        /// Add an item: ID or ID:QTY (repeatable, applied in order)
        #[arg(long = "add", value_name = "ID[:QTY]")]
        add: Vec<String>,

        /// Overwrite a line's quantity: ID:QTY (repeatable)
        #[arg(long = "set", value_name = "ID:QTY")]
        set: Vec<String>,

        /// Remove a line (repeatable)
        #[arg(long = "remove", value_name = "ID")]
        remove: Vec<String>,
    },
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    brand: String,
    #[arg(long)]
    price: f64,
    #[arg(long)]
    category: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    stock: u32,
    #[arg(long)]
    image: Option<String>,
}

#[derive(Args)]
struct UpdateArgs {
    /// Item id
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    stock: Option<u32>,
    #[arg(long)]
    image: Option<String>,
}

/// Collects error-channel messages and echoes them to stderr
struct ErrorView {
    messages: Arc<Mutex<Vec<String>>>,
    subscription: Subscription,
}

impl ErrorView {
    fn attach(storefront: &Storefront) -> Self {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        let subscription = storefront.errors().subscribe(move |message| {
            eprintln!("error: {}", message);
            sink.lock().push(message.clone());
        });
        Self {
            messages,
            subscription,
        }
    }

    /// Release the subscription; fail if anything was reported
    fn finish(self) -> Result<()> {
        self.subscription.release();
        let count = self.messages.lock().len();
        if count > 0 {
            bail!("{} operation(s) failed", count);
        }
        Ok(())
    }
}

/// Default filter directives for the library and this binary's module path
fn log_directives(verbose: bool) -> [String; 2] {
    let level = if verbose { "debug" } else { "error" };
    [
        format!("storefront_core={}", level),
        format!("{}={}", module_path!(), level),
    ]
}

fn init_logging(verbose: bool) -> Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for directive in log_directives(verbose) {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
    Ok(())
}

fn sample_catalog() -> Vec<CatalogItem> {
    let entry = |id: &str, name: &str, brand: &str, price: f64, category: &str, stock: u32| {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            brand: brand.to_string(),
            price,
            category: category.to_string(),
            description: format!("{} by {}", name, brand),
            stock,
            image: storefront_core::config::DEFAULT_IMAGE.to_string(),
        }
    };

    vec![
        entry("1", "Trail Runner", "Stride", 89.9, "Shoes", 4),
        entry("2", "Court Classic", "Stride", 64.5, "Shoes", 2),
        entry("3", "Gym Duffel", "Packwell", 39.0, "Bags", 6),
        entry("4", "Pro Racket", "Volley", 129.99, "Tennis", 1),
        entry("5", "Match Balls (3)", "Volley", 7.49, "Tennis", 0),
    ]
}

fn build_storefront(cli: &Cli) -> Result<Storefront> {
    if cli.offline {
        info!("Using offline sample catalog");
        let gateway = MemoryCatalogGateway::with_items(sample_catalog());
        return Ok(Storefront::new(Arc::new(gateway)));
    }

    let mut config = StorefrontConfig::default();
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url.clone());
    }
    debug!("Config: {:?}", config);

    Storefront::from_config(&config).map_err(|e| anyhow!("Failed to set up catalog gateway: {}", e))
}

/// Parse `ID[:QTY]`; quantity defaults to `default_qty`
fn parse_line_spec(spec: &str, default_qty: Option<u32>) -> Result<(String, u32)> {
    match spec.rsplit_once(':') {
        Some((id, qty)) => {
            let qty = qty
                .parse()
                .map_err(|_| anyhow!("Invalid quantity in '{}'", spec))?;
            Ok((id.to_string(), qty))
        }
        None => match default_qty {
            Some(qty) => Ok((spec.to_string(), qty)),
            None => bail!("Expected ID:QTY, got '{}'", spec),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loaded before logging so RUST_LOG from .env applies; reported after
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    if let Err(e) = dotenv {
        warn!("No .env file loaded: {}", e);
    }

    let storefront = build_storefront(&cli)?;
    let errors = ErrorView::attach(&storefront);

    match cli.command {
        Commands::List { category } => cmd_list(&storefront, &category).await,
        Commands::Categories => cmd_categories(&storefront).await,
        Commands::Create(args) => cmd_create(&storefront, args).await?,
        Commands::Update(args) => cmd_update(&storefront, args).await?,
        Commands::Delete { id } => cmd_delete(&storefront, &id).await,
        Commands::Cart { add, set, remove } => cmd_cart(&storefront, &add, &set, &remove).await?,
    }

    errors.finish()
}

fn print_items(items: &[CatalogItem]) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    println!(
        "{:<38}  {:<24}  {:<12}  {:>9}  {:>5}",
        "ID", "NAME", "CATEGORY", "PRICE", "STOCK"
    );
    println!("{}", "-".repeat(96));

    for item in items {
        let name: String = item.name.chars().take(24).collect();
        println!(
            "{:<38}  {:<24}  {:<12}  {:>9.2}  {:>5}",
            item.id, name, item.category, item.price, item.stock
        );
    }

    println!("\nTotal: {} items", items.len());
}

async fn cmd_list(storefront: &Storefront, category: &str) {
    let catalog = storefront.catalog();
    catalog.set_category_filter(category);
    catalog.load().await;

    println!("Category: {}", catalog.current_category());
    print_items(&catalog.visible_items());
}

async fn cmd_categories(storefront: &Storefront) {
    let catalog = storefront.catalog();
    catalog.load().await;

    println!("{}", CategoryFilter::All);
    for category in catalog.categories() {
        println!("{}", category);
    }
}

async fn cmd_create(storefront: &Storefront, args: CreateArgs) -> Result<()> {
    let draft = ItemDraft {
        name: args.name,
        brand: args.brand,
        price: args.price,
        category: args.category,
        description: args.description,
        stock: args.stock,
        image: args.image,
    };
    draft.validate()?;

    let catalog = storefront.catalog();
    let before = catalog.all_items().len();
    catalog.create(draft).await;

    if let Some(created) = catalog.all_items().get(before) {
        println!("Created item {} ({})", created.id, created.name);
    }
    Ok(())
}

async fn cmd_update(storefront: &Storefront, args: UpdateArgs) -> Result<()> {
    let catalog = storefront.catalog();
    catalog.load().await;

    let mut item = catalog
        .all_items()
        .into_iter()
        .find(|item| item.id == args.id)
        .ok_or_else(|| anyhow!("No catalog item with id {}", args.id))?;

    if let Some(name) = args.name {
        item.name = name;
    }
    if let Some(brand) = args.brand {
        item.brand = brand;
    }
    if let Some(price) = args.price {
        item.price = price;
    }
    if let Some(category) = args.category {
        item.category = category;
    }
    if let Some(description) = args.description {
        item.description = description;
    }
    if let Some(stock) = args.stock {
        item.stock = stock;
    }
    if let Some(image) = args.image {
        item.image = image;
    }
    item.to_draft().validate()?;

    let id = item.id.clone();
    catalog.update(item).await;

    if let Some(stored) = catalog.all_items().into_iter().find(|i| i.id == id) {
        print_items(&[stored]);
    }
    Ok(())
}

async fn cmd_delete(storefront: &Storefront, id: &str) {
    let catalog = storefront.catalog();
    catalog.load().await;

    let before = catalog.all_items().len();
    catalog.remove(id).await;

    if catalog.all_items().len() < before {
        println!("Deleted item {}", id);
    }
}

async fn cmd_cart(
    storefront: &Storefront,
    add: &[String],
    set: &[String],
    remove: &[String],
) -> Result<()> {
    let catalog = storefront.catalog();
    let cart = storefront.cart();
    catalog.load().await;
    let items = catalog.all_items();

    for spec in add {
        let (id, qty) = parse_line_spec(spec, Some(1))?;
        match items.iter().find(|item| item.id == id) {
            Some(item) => cart.add_item(item.clone(), qty),
            None => storefront
                .errors()
                .publish(format!("Unknown catalog item: {}", id)),
        }
    }
    for spec in set {
        let (id, qty) = parse_line_spec(spec, None)?;
        cart.set_quantity(&id, qty);
    }
    for id in remove {
        cart.remove_item(id);
    }

    let lines = cart.lines();
    if lines.is_empty() {
        println!("Cart is empty.");
        return Ok(());
    }

    println!("{:<24}  {:>9}  {:>4}  {:>10}", "ITEM", "PRICE", "QTY", "SUBTOTAL");
    println!("{}", "-".repeat(53));
    for line in &lines {
        let name: String = line.item.name.chars().take(24).collect();
        println!(
            "{:<24}  {:>9.2}  {:>4}  {:>10.2}",
            name,
            line.item.price,
            line.quantity,
            line.subtotal()
        );
    }
    println!("{}", "-".repeat(53));
    println!("{:<24}  {:>27.2}", "TOTAL", cart.total());

    Ok(())
}
