//! Storefront cart CLI - inspect and edit guest and customer carts.
//!
//! # Usage
//!
//! ```bash
//! # Show the guest cart file
//! cart-cli guest show
//!
//! # Add two units of product 12, variant 5 to the guest cart
//! cart-cli guest add 12 --variant 5 -q 2 --price 19.99 --stock 10 --title "Tote"
//!
//! # Show the customer's server cart (needs CART_API_TOKEN)
//! cart-cli remote show
//!
//! # Merge the guest cart into the customer's server cart
//! cart-cli login
//! ```
//!
//! # Commands
//!
//! - `guest` - Edit the guest cart file (`GUEST_CART_PATH`)
//! - `remote` - Edit the customer's server cart
//! - `login` - Reconcile the guest cart into the server cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cart::{CartConfig, LogFormat};
use storefront_cart_core::{CartItemId, LineKey, ProductId, VariantId};

mod commands;

#[derive(Parser)]
#[command(name = "cart-cli")]
#[command(author, version, about = "Storefront cart tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit the guest cart file
    Guest {
        #[command(subcommand)]
        action: GuestAction,
    },
    /// Edit the customer's server cart
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },
    /// Merge the guest cart into the customer's server cart
    Login,
}

#[derive(Subcommand)]
enum GuestAction {
    /// Print the guest cart
    Show,
    /// Add a line (merged with an existing line of the same product/variant)
    Add {
        /// Product ID
        product: ProductId,

        /// Variant ID
        #[arg(short, long)]
        variant: Option<VariantId>,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Unit price at the time of adding
        #[arg(short, long)]
        price: Decimal,

        /// Known stock; the line is clamped to it
        #[arg(short, long)]
        stock: u32,

        /// Display title
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Add one unit to a line (`product` or `product/variant`)
    Inc {
        #[arg(value_parser = commands::parse_line_key)]
        line: LineKey,
    },
    /// Remove one unit from a line (`product` or `product/variant`)
    Dec {
        #[arg(value_parser = commands::parse_line_key)]
        line: LineKey,
    },
    /// Remove a line (`product` or `product/variant`)
    Remove {
        #[arg(value_parser = commands::parse_line_key)]
        line: LineKey,
    },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum RemoteAction {
    /// Print the server cart
    Show,
    /// Add a line
    Add {
        /// Product ID
        product: ProductId,

        /// Variant ID
        #[arg(short, long)]
        variant: Option<VariantId>,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Add one unit to a cart item
    Inc { item: CartItemId },
    /// Remove one unit from a cart item
    Dec { item: CartItemId },
    /// Remove a cart item
    Remove { item: CartItemId },
    /// Remove every item
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry error tracking initialized");
    Some(guard)
}

/// Map tracing levels to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront_cart=info,storefront_cart_cli=info".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CartConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &CartConfig) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Guest { action } => match action {
            GuestAction::Show => commands::guest::show(config),
            GuestAction::Add {
                product,
                variant,
                quantity,
                price,
                stock,
                title,
            } => commands::guest::add(config, product, variant, quantity, price, stock, title)?,
            GuestAction::Inc { line } => commands::guest::increment(config, line)?,
            GuestAction::Dec { line } => commands::guest::decrement(config, line)?,
            GuestAction::Remove { line } => commands::guest::remove(config, line)?,
            GuestAction::Clear => commands::guest::clear(config)?,
        },
        Commands::Remote { action } => {
            let service = commands::remote::connect(config).await?;
            match action {
                RemoteAction::Show => {}
                RemoteAction::Add {
                    product,
                    variant,
                    quantity,
                } => commands::remote::add(&service, product, variant, quantity).await?,
                RemoteAction::Inc { item } => commands::remote::increment(&service, item).await?,
                RemoteAction::Dec { item } => commands::remote::decrement(&service, item).await?,
                RemoteAction::Remove { item } => commands::remote::remove(&service, item).await?,
                RemoteAction::Clear => commands::remote::clear(&service).await?,
            }
            commands::remote::show(&service);
        }
        Commands::Login => commands::login::run(config).await?,
    }
    Ok(())
}
