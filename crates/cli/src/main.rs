//! Duka CLI - Command-line storefront.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (session persists in DUKA_STATE_PATH)
//! duka login -e amina@duka.co.ke -p secret
//!
//! # Browse and fill the cart
//! duka products list --search sandals
//! duka cart add <product-id> -q 2
//!
//! # Check out and pay with M-Pesa
//! duka checkout --address "Moi Avenue, Nairobi" --phone 254712345678
//! duka pay <order-id> --phone 254712345678
//!
//! # See where a page visit would land
//! duka navigate /admin
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `logout`, `whoami` - Session
//! - `products` - Catalog
//! - `cart` - Cart
//! - `checkout`, `orders` - Orders
//! - `pay`, `payment-status` - M-Pesa payments
//! - `admin` - Admin panel operations
//! - `navigate` - Run the navigation guard for a path
//! - `health` - Backend health check

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use duka_client::Storefront;
use duka_client::config::ClientConfig;
use duka_client::storage::FileStore;
use duka_client::telemetry;
use duka_core::{Money, OrderId, OrderStatus, ProductId, Role, TransactionId, UserId};

mod commands;

#[derive(Parser)]
#[command(name = "duka")]
#[command(author, version, about = "Duka storefront CLI")]
struct Cli {
    /// Override the state file (defaults to `DUKA_STATE_PATH`)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "DUKA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "DUKA_PASSWORD", hide_env_values = true)]
        password: String,

        /// Full name
        #[arg(short, long)]
        name: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in account (re-validated against the backend)
    Whoami,
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart contents
    Checkout {
        /// Shipping address
        #[arg(short, long)]
        address: String,

        /// M-Pesa phone number
        #[arg(short, long)]
        phone: String,
    },
    /// Your orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Pay for an order with M-Pesa
    Pay {
        order_id: OrderId,

        /// M-Pesa phone number
        #[arg(short, long)]
        phone: String,
    },
    /// Check a payment transaction
    PaymentStatus { transaction_id: TransactionId },
    /// Admin panel operations
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Evaluate the navigation guard for a path
    Navigate { path: String },
    /// Check that the backend is up
    Health,
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        min_price: Option<Money>,
        #[arg(long)]
        max_price: Option<Money>,
    },
    /// Show one product
    Show { id: ProductId },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product (stock is checked against the catalog)
    Add {
        id: ProductId,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Set { id: ProductId, quantity: u32 },
    /// Remove a line
    Remove { id: ProductId },
    /// Add one unit
    Inc { id: ProductId },
    /// Take away one unit
    Dec { id: ProductId },
    /// Empty the cart
    Clear,
    /// Re-sync stock limits with the catalog
    Refresh,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List your orders
    List,
    /// Show one order
    Show { id: OrderId },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List every order
    Orders,
    /// Change an order's status
    Status { id: OrderId, status: OrderStatus },
    /// Create a product
    CreateProduct {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long)]
        price: Money,
        #[arg(short, long)]
        stock: u32,
        #[arg(short, long)]
        category: String,
        /// Image file to upload
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// Update selected fields of a product
    UpdateProduct {
        id: ProductId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<Money>,
        #[arg(long)]
        stock: Option<u32>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete a product
    DeleteProduct { id: ProductId },
    /// List accounts
    Users,
    /// Show one account
    User { id: UserId },
    /// Change an account's role
    SetRole { id: UserId, role: Role },
    /// Disable an account
    DeleteUser { id: UserId },
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(config.log_format);

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), commands::CliError> {
    let state_path = cli.state.unwrap_or_else(|| config.state_path.clone());
    let store = Arc::new(FileStore::open(state_path)?);
    let shop = Storefront::init(config, store)?;

    let result = dispatch(&shop, cli.command).await;
    shop.shutdown();
    result
}

async fn dispatch(shop: &Storefront, command: Commands) -> Result<(), commands::CliError> {
    use commands::{admin, auth, cart, orders, payments, products};

    match command {
        Commands::Login { email, password } => auth::login(shop, &email, password).await?,
        Commands::Register {
            email,
            password,
            name,
        } => auth::register(shop, &email, password, name).await?,
        Commands::Logout => auth::logout(shop),
        Commands::Whoami => auth::whoami(shop).await?,
        Commands::Products { action } => match action {
            ProductsAction::List {
                page,
                limit,
                search,
                category,
                min_price,
                max_price,
            } => {
                let query = duka_client::api::ProductQuery {
                    page,
                    limit,
                    search,
                    category,
                    min_price,
                    max_price,
                };
                products::list(shop, &query).await?;
            }
            ProductsAction::Show { id } => products::show(shop, id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => cart::show(shop),
            CartAction::Add { id, quantity } => cart::add(shop, id, quantity).await?,
            CartAction::Set { id, quantity } => cart::set(shop, id, quantity)?,
            CartAction::Remove { id } => cart::remove(shop, id),
            CartAction::Inc { id } => cart::increment(shop, id)?,
            CartAction::Dec { id } => cart::decrement(shop, id)?,
            CartAction::Clear => cart::clear(shop),
            CartAction::Refresh => cart::refresh(shop).await?,
        },
        Commands::Checkout { address, phone } => orders::checkout(shop, &address, &phone).await?,
        Commands::Orders { action } => match action {
            OrdersAction::List => orders::list(shop).await?,
            OrdersAction::Show { id } => orders::show(shop, id).await?,
        },
        Commands::Pay { order_id, phone } => payments::pay(shop, order_id, &phone).await?,
        Commands::PaymentStatus { transaction_id } => {
            payments::status(shop, transaction_id).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Orders => admin::orders(shop).await?,
            AdminAction::Status { id, status } => admin::set_status(shop, id, status).await?,
            AdminAction::CreateProduct {
                name,
                description,
                price,
                stock,
                category,
                image,
            } => {
                let form = admin::NewProduct {
                    name,
                    description,
                    price,
                    stock,
                    category,
                    image,
                };
                admin::create_product(shop, form).await?;
            }
            AdminAction::UpdateProduct {
                id,
                name,
                description,
                price,
                stock,
                category,
                image,
            } => {
                let changes = admin::ProductChanges {
                    name,
                    description,
                    price,
                    stock,
                    category,
                    image,
                };
                admin::update_product(shop, id, changes).await?;
            }
            AdminAction::DeleteProduct { id } => admin::delete_product(shop, id).await?,
            AdminAction::Users => admin::users(shop).await?,
            AdminAction::User { id } => admin::user(shop, id).await?,
            AdminAction::SetRole { id, role } => admin::set_role(shop, id, role).await?,
            AdminAction::DeleteUser { id } => admin::delete_user(shop, id).await?,
        },
        Commands::Navigate { path } => commands::navigate(shop, &path),
        Commands::Health => commands::health(shop).await?,
    }
    Ok(())
}
