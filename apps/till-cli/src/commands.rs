//! Command handlers: one `Till` call per subcommand, then plain-text output.

use std::io::{self, BufRead, IsTerminal};

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use dialoguer::Password;
use till_client::{ClientError, ClientResult, Severity, Till};
use till_core::{
    Credentials, MpesaPaymentRequest, NewCustomer, NewProduct, SalesReportQuery, SignupRequest,
};

use crate::{CartCommand, Command, SignupArgs};

pub async fn run(till: &Till, command: Command) -> ClientResult<()> {
    match command {
        Command::Login { username, password } => {
            let password = password_or_stdin(password)?;
            let identity = till.login(&Credentials::new(username, password)).await?;
            print_notification(till);
            println!("Signed in as {} ({})", identity.display_name, identity.role);
        }
        Command::Logout => {
            till.logout().await;
            println!("Signed out");
        }
        Command::Whoami => match till.session().identity() {
            Some(identity) => {
                println!("{} (#{}, {})", identity.display_name, identity.subject_id, identity.role);
                if let Some(exp) = identity.expires_at {
                    println!("Session expires {}", exp.to_rfc3339());
                }
            }
            None => println!("Not signed in"),
        },
        Command::Signup(args) => signup(till, args).await?,
        Command::Products { search } => {
            let products = match search {
                Some(query) => till.search_products(&query).await?,
                None => till.products().await?,
            };
            if products.is_empty() {
                println!("No products");
            }
            for p in products {
                println!(
                    "{:>5}  {:<32} {:>10}  stock {}",
                    p.id,
                    p.name,
                    p.price.to_string(),
                    p.stock
                );
            }
        }
        Command::AddProduct {
            name,
            price,
            stock,
            category_id,
        } => {
            let created = till
                .create_product(&NewProduct {
                    name,
                    price,
                    stock,
                    category_id,
                })
                .await?;
            println!(
                "Created product #{} {} at {}{}",
                created.product.id,
                created.product.name,
                created.product.price,
                created
                    .product
                    .sku
                    .map(|sku| format!(" (SKU {})", sku))
                    .unwrap_or_default()
            );
        }
        Command::Inventory => {
            let summary = till.inventory().await?;
            if let Some(total) = summary.total_products {
                println!("Products tracked: {}", total);
            }
            if summary.critical_items.is_empty() {
                println!("No items at critical stock");
            }
            for item in summary.critical_items {
                println!("  {:<32} {} left", item.name, item.stock_level);
            }
        }
        Command::Cart(cmd) => cart(till, cmd).await?,
        Command::Checkout => {
            let receipt = till.checkout().await?;
            print_notification(till);
            if let Some(id) = receipt.transaction_id {
                println!("Transaction #{}", id);
            }
        }
        Command::Report { from, to } => {
            let query = SalesReportQuery::new(start_of_day(from), end_of_day(to));
            let report = till.sales_report(&query).await?;
            for point in &report.report {
                println!(
                    "{:<20} {:>12} {:>5} sales",
                    point.timestamp,
                    point.total_sales.to_string(),
                    point.transaction_count
                );
            }
            println!(
                "Total {} across {} transactions",
                report.total_sales(),
                report.transaction_count()
            );
        }
        Command::Customers => {
            for c in till.customers().await? {
                println!(
                    "{:>5}  {:<24} {:<28} {}",
                    c.id,
                    c.name,
                    c.email.unwrap_or_default(),
                    c.phone.unwrap_or_default()
                );
            }
        }
        Command::AddCustomer { name, email, phone } => {
            let created = till
                .add_customer(&NewCustomer { name, email, phone })
                .await?;
            println!("Added customer #{} {}", created.customer.id, created.customer.name);
        }
        Command::Dashboard => {
            let stats = till.dashboard().await?;
            println!("Total sales         {}", stats.total_sales);
            println!("Active products     {}", stats.active_products);
            println!("Critical inventory  {}", stats.critical_inventory);
            println!("Recent customers    {}", stats.recent_customers);
        }
        Command::AuditLogs { page, per_page } => {
            let logs = till.audit_logs(page, per_page).await?;
            for entry in &logs.logs {
                println!(
                    "{:<20} user {:>4}  {:<16} {}",
                    entry.timestamp, entry.user_id, entry.action, entry.details
                );
            }
            if let Some(pages) = logs.pages {
                println!("Page {} of {}", page, pages);
            }
        }
        Command::Pay {
            phone,
            amount,
            transaction_id,
        } => {
            till.mpesa_payment(&MpesaPaymentRequest {
                phone,
                amount,
                transaction_id,
            })
            .await?;
            print_notification(till);
        }
    }
    Ok(())
}

async fn signup(till: &Till, args: SignupArgs) -> ClientResult<()> {
    let password = password_or_stdin(args.password)?;
    let receipt = till
        .signup(&SignupRequest {
            username: args.username,
            email: args.email,
            password,
            role: args.role,
            accept_terms: args.accept_terms,
        })
        .await?;
    print_notification(till);
    if let Some(user) = receipt.user {
        println!("Account #{} ({})", user.id, user.role);
    }
    Ok(())
}

async fn cart(till: &Till, command: CartCommand) -> ClientResult<()> {
    let snapshot = match command {
        CartCommand::Show => till.cart().snapshot(),
        CartCommand::Add {
            product_id,
            quantity,
        } => {
            let products = till.products().await?;
            let product = products
                .iter()
                .find(|p| p.id == product_id)
                .ok_or_else(|| ClientError::Http {
                    status: 404,
                    message: format!("No product with id {}", product_id),
                })?;
            till.add_to_cart(product, quantity)?
        }
        CartCommand::Remove { product_id } => till.cart().remove_item(product_id),
        CartCommand::Clear => till.cart().clear(),
    };

    if snapshot.items.is_empty() {
        println!("Cart is empty");
        return Ok(());
    }
    for item in &snapshot.items {
        println!(
            "{:>5}  {:<32} {:>4} x {:>10} = {}",
            item.id,
            item.name,
            item.quantity,
            item.price.to_string(),
            item.line_total()
        );
    }
    println!("Total {}", snapshot.total);
    Ok(())
}

/// Prints the success message the last operation posted, if any.
fn print_notification(till: &Till) {
    if let Some(n) = till.notifier().current() {
        if n.severity == Severity::Success {
            println!("{}", n.message);
        }
    }
}

/// Prompts without echo on a terminal; piped input is read as one line.
fn password_or_stdin(password: Option<String>) -> ClientResult<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    if io::stdin().is_terminal() {
        return Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()).into());
    }

    Ok(read_secret_line(io::stdin().lock())?)
}

fn read_secret_line(mut input: impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn start_of_day(date: NaiveDate) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Last second of `date`, so `--to` is inclusive.
fn end_of_day(date: NaiveDate) -> chrono::DateTime<Utc> {
    let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piped_password_reads_one_line() {
        assert_eq!(read_secret_line(&b"s3cret pass\r\nnext"[..]).unwrap(), "s3cret pass");
        assert_eq!(read_secret_line(&b""[..]).unwrap(), "");
    }

    #[test]
    fn test_given_password_skips_prompt() {
        assert_eq!(password_or_stdin(Some("pw123456".into())).unwrap(), "pw123456");
    }

    #[test]
    fn test_report_range_is_inclusive() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(start_of_day(day).to_rfc3339(), "2024-03-07T00:00:00+00:00");
        assert_eq!(end_of_day(day).to_rfc3339(), "2024-03-07T23:59:59+00:00");
    }
}
