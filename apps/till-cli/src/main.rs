//! # Till CLI
//!
//! Terminal front end for the Till POS client.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CLI Startup                                      │
//! │                                                                         │
//! │  1. Parse arguments (clap)                                              │
//! │  2. Initialize tracing (RUST_LOG, default warn,till=info, stderr)       │
//! │  3. Load ClientConfig (defaults → config.toml → TILL_* env)             │
//! │  4. Build Till (HttpTransport + FileStore in the data dir)              │
//! │  5. Restore the session (verify the stored token)                       │
//! │  6. Run one command, print the result or the error's user message       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//! ```text
//! till login --username cashier1
//! till products --search sugar
//! till cart add --product-id 3 --quantity 2
//! till checkout
//! till pay --phone 254712345678 --amount 250 --transaction-id 77
//! ```

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use till_client::{ClientConfig, ClientResult, Till};
use till_core::{Money, Role};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "till", version, about = "Point-of-sale client for the Till backend")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and keep the session for later commands
    Login {
        /// Username or email
        #[arg(long, short)]
        username: String,
        /// Prompted for (without echo) when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out, locally and on the server
    Logout,
    /// Show the signed-in employee
    Whoami,
    /// Register a cashier or manager account
    Signup(SignupArgs),
    /// List products
    Products {
        /// Case-insensitive name filter
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Create a product
    AddProduct {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_money)]
        price: Money,
        #[arg(long, default_value_t = 0)]
        stock: i64,
        #[arg(long)]
        category_id: Option<i64>,
    },
    /// Show items at critical stock levels
    Inventory,
    /// Inspect or change the cart
    #[command(subcommand)]
    Cart(CartCommand),
    /// Submit the cart as a sale
    Checkout,
    /// Sales report for a date range (inclusive, YYYY-MM-DD)
    Report {
        #[arg(long)]
        from: chrono::NaiveDate,
        #[arg(long)]
        to: chrono::NaiveDate,
    },
    /// List customers
    Customers,
    /// Add a customer
    AddCustomer {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
    },
    /// Admin dashboard figures
    Dashboard,
    /// Admin audit trail
    AuditLogs {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = till_client::DEFAULT_PER_PAGE)]
        per_page: u32,
    },
    /// Start an M-Pesa payment on the customer's phone
    Pay {
        #[arg(long)]
        phone: String,
        #[arg(long, value_parser = parse_money)]
        amount: Money,
        #[arg(long)]
        transaction_id: String,
    },
}

#[derive(Debug, Args)]
struct SignupArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "cashier", value_parser = parse_role)]
    role: Role,
    /// Prompted for (without echo) when omitted
    #[arg(long)]
    password: Option<String>,
    /// Accept the terms of service
    #[arg(long)]
    accept_terms: bool,
}

#[derive(Debug, Subcommand)]
enum CartCommand {
    /// Show items and total
    Show,
    /// Add a product by id
    Add {
        #[arg(long)]
        product_id: i64,
        #[arg(long, default_value_t = 1)]
        quantity: i64,
    },
    /// Remove a product by id
    Remove {
        #[arg(long)]
        product_id: i64,
    },
    /// Empty the cart
    Clear,
}

fn parse_money(s: &str) -> Result<Money, String> {
    let value: f64 = s.trim().parse().map_err(|_| format!("'{}' is not an amount", s))?;
    Money::from_decimal(value).ok_or_else(|| format!("'{}' is not an amount", s))
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse::<Role>().map_err(|e| e.to_string())
}

/// Initializes the tracing subscriber. Logs go to stderr so command output
/// stays pipeable.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,till=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build(cli: &Cli) -> ClientResult<Till> {
    let mut config = ClientConfig::load(cli.config.clone())?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
        config.validate()?;
    }
    Till::from_config(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let till = match build(&cli) {
        Ok(till) => till,
        Err(e) => {
            eprintln!("error: {}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    let state = till.start().await;
    debug!(authenticated = state.is_authenticated(), "Startup complete");

    match commands::run(&till, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("12.5").unwrap(), Money::from_cents(1250));
        assert_eq!(parse_money(" 3 ").unwrap(), Money::from_major(3));
        assert!(parse_money("ten").is_err());
        assert!(parse_money("inf").is_err());
    }

    #[test]
    fn test_parse_cart_add() {
        let cli = Cli::try_parse_from([
            "till",
            "cart",
            "add",
            "--product-id",
            "3",
            "--quantity",
            "2",
        ])
        .unwrap();
        match cli.command {
            Command::Cart(CartCommand::Add { product_id, quantity }) => {
                assert_eq!(product_id, 3);
                assert_eq!(quantity, 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_signup_role_defaults_to_cashier() {
        let cli = Cli::try_parse_from([
            "till", "signup", "--username", "jane_doe", "--email", "jane@example.com",
        ])
        .unwrap();
        match cli.command {
            Command::Signup(args) => {
                assert_eq!(args.role, Role::Cashier);
                assert!(!args.accept_terms);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_report_dates() {
        let cli = Cli::try_parse_from([
            "till",
            "report",
            "--from",
            "2024-03-01",
            "--to",
            "2024-03-07",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Report { .. }));
        let bad_date = ["till", "report", "--from", "March", "--to", "2024-03-07"];
        assert!(Cli::try_parse_from(bad_date).is_err());
    }
}
