//! Order ledger command-line front end
//!
//! Each invocation opens the ledger, applies one edit (or prints a view)
//! and exits. Ids may be shortened to any unique prefix.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use order_ledger::{Config, Customer, CustomerId, Ledger, LineItemId};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "order-ledger", version, about = "Food order ledger")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "ORDER_LEDGER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a customer for a flat
    AddCustomer { flat: String },
    /// Delete a customer and its order
    DeleteCustomer { customer: String },
    /// Add an empty line to a customer's order
    AddItem { customer: String },
    /// Pick a dish for a line
    Select {
        customer: String,
        item: String,
        dish: String,
    },
    /// Change a line's quantity
    Quantity {
        customer: String,
        item: String,
        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Remove a line
    DeleteItem { customer: String, item: String },
    /// Set the order time
    OrderTime { customer: String, value: String },
    /// Set the delivery time
    DeliveryTime { customer: String, value: String },
    /// Set review comments
    Review { customer: String, value: String },
    /// Show all customers, newest first
    List,
    /// Show the menu
    Menu,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
            .with_env_overrides()?,
        None => Config::from_env()?,
    };

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config))
        .with_writer(std::io::stderr)
        .init();

    let mut ledger = Ledger::open(&config)?;
    tracing::debug!(customers = ledger.len(), "Ledger opened");

    let symbol = config.currency_symbol.as_str();
    let changed = match cli.command {
        Command::AddCustomer { flat } => match ledger.add_customer(&flat) {
            Some(id) => {
                println!("{}", id);
                true
            }
            None => false,
        },
        Command::DeleteCustomer { customer } => {
            let id = resolve_customer(&ledger, &customer)?;
            ledger.delete_customer(id)
        }
        Command::AddItem { customer } => {
            let id = resolve_customer(&ledger, &customer)?;
            match ledger.add_line_item(id) {
                Some(item) => {
                    println!("{}", item);
                    true
                }
                None => false,
            }
        }
        Command::Select {
            customer,
            item,
            dish,
        } => {
            let (id, item) = resolve_item(&ledger, &customer, &item)?;
            let entry = ledger
                .catalog()
                .find(&dish)
                .cloned()
                .ok_or_else(|| anyhow!("{} is not on the menu", dish))?;
            ledger.select_menu_item(id, item, &entry)
        }
        Command::Quantity {
            customer,
            item,
            quantity,
        } => {
            let (id, item) = resolve_item(&ledger, &customer, &item)?;
            ledger.set_quantity(id, item, quantity)
        }
        Command::DeleteItem { customer, item } => {
            let (id, item) = resolve_item(&ledger, &customer, &item)?;
            ledger.delete_line_item(id, item)
        }
        Command::OrderTime { customer, value } => {
            let id = resolve_customer(&ledger, &customer)?;
            ledger.set_order_time(id, value)
        }
        Command::DeliveryTime { customer, value } => {
            let id = resolve_customer(&ledger, &customer)?;
            ledger.set_delivery_time(id, value)
        }
        Command::Review { customer, value } => {
            let id = resolve_customer(&ledger, &customer)?;
            ledger.set_review_comments(id, value)
        }
        Command::List => {
            for customer in ledger.most_recent_first() {
                print_customer(customer, symbol);
            }
            return Ok(());
        }
        Command::Menu => {
            for item in ledger.catalog().items() {
                println!("{:<40} {}{}", item.name, symbol, item.price);
            }
            return Ok(());
        }
    };

    if !changed {
        eprintln!("unchanged");
    }

    if let Some(err) = ledger.last_persist_error() {
        bail!("change applied but not saved: {}", err);
    }

    Ok(())
}

fn log_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

fn resolve_customer(ledger: &Ledger, prefix: &str) -> anyhow::Result<CustomerId> {
    let mut matches = ledger
        .customers()
        .iter()
        .filter(|c| c.id.to_string().starts_with(prefix));

    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no customer with id {}", prefix))?;
    if matches.next().is_some() {
        bail!("customer id {} is ambiguous", prefix);
    }
    Ok(first.id)
}

fn resolve_item(
    ledger: &Ledger,
    customer: &str,
    prefix: &str,
) -> anyhow::Result<(CustomerId, LineItemId)> {
    let id = resolve_customer(ledger, customer)?;
    let customer = ledger
        .customer(id)
        .ok_or_else(|| anyhow!("no customer with id {}", id))?;

    let mut matches = customer
        .orders
        .iter()
        .filter(|item| item.id.to_string().starts_with(prefix));

    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no line item with id {}", prefix))?;
    if matches.next().is_some() {
        bail!("line item id {} is ambiguous", prefix);
    }
    Ok((id, first.id))
}

fn print_customer(customer: &Customer, symbol: &str) {
    let date = customer
        .created_at
        .with_timezone(&chrono::Local)
        .format("%d/%m/%Y");

    println!("Flat Number: {}  Date: {}  [{}]", customer.flat_number, date, customer.id);
    for (label, value) in [
        ("Order time", &customer.order_time),
        ("Delivery time", &customer.delivery_time),
        ("Review", &customer.review_comments),
    ] {
        if !value.is_empty() {
            println!("  {}: {}", label, value);
        }
    }

    println!(
        "  {:<36} {:<40} {:>8} {:>8} {:>9}",
        "Item", "Menu Item", "Quantity", "Price", "Total"
    );
    for item in &customer.orders {
        let name = if item.is_selected() {
            item.name.as_str()
        } else {
            "(select menu item)"
        };
        println!(
            "  {:<36} {:<40} {:>8} {:>8} {:>9}",
            item.id.to_string(),
            name,
            item.quantity.get(),
            format!("{}{}", symbol, item.price),
            format!("{}{}", symbol, Ledger::line_total(item)),
        );
    }
    println!(
        "  {:<36} {:<40} {:>8} {:>8} {:>9}",
        "",
        "Total:",
        "",
        "",
        format!("{}{}", symbol, Ledger::total_for(customer))
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_ledger::{Catalog, MemoryStore, SnapshotStore};
    use std::sync::Arc;

    fn create_test_ledger() -> Ledger {
        Ledger::new(
            SnapshotStore::with_default_key(Arc::new(MemoryStore::new())),
            Arc::new(Catalog::builtin()),
        )
    }

    fn shortened(id: impl ToString) -> String {
        let full = id.to_string();
        full[..full.len() - 1].to_string()
    }

    #[test]
    fn test_resolve_customer_by_prefix() {
        let mut ledger = create_test_ledger();
        let first = ledger.add_customer("A-101").unwrap();
        let second = ledger.add_customer("B-202").unwrap();

        assert_eq!(resolve_customer(&ledger, &first.to_string()).unwrap(), first);
        assert_eq!(resolve_customer(&ledger, &shortened(second)).unwrap(), second);

        let err = resolve_customer(&ledger, "zzz").unwrap_err();
        assert!(err.to_string().contains("no customer"));

        // Every id starts with the empty string
        let err = resolve_customer(&ledger, "").unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn test_resolve_item_by_prefix() {
        let mut ledger = create_test_ledger();
        let customer = ledger.add_customer("A-101").unwrap();
        let first = ledger.add_line_item(customer).unwrap();
        let second = ledger.add_line_item(customer).unwrap();
        let prefix = customer.to_string();

        assert_eq!(
            resolve_item(&ledger, &prefix, &first.to_string()).unwrap(),
            (customer, first)
        );
        assert_eq!(
            resolve_item(&ledger, &prefix, &shortened(second)).unwrap(),
            (customer, second)
        );

        let err = resolve_item(&ledger, &prefix, "zzz").unwrap_err();
        assert!(err.to_string().contains("no line item"));

        let err = resolve_item(&ledger, &prefix, "").unwrap_err();
        assert!(err.to_string().contains("ambiguous"));

        // Unknown customer fails before items are looked at
        let err = resolve_item(&ledger, "zzz", &first.to_string()).unwrap_err();
        assert!(err.to_string().contains("no customer"));
    }
}
