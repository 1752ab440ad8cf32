//! Login merge command.
//!
//! Opens the guest cart file, logs in as the configured customer, and merges
//! the guest lines into their server cart. The guest file is emptied
//! afterwards, including lines the server refused.

use secrecy::SecretString;
use storefront_cart::{
    CartApiClient, CartConfig, CartSession, GuestCartStore, JsonFileStorage, MergeReport,
};

use super::{CommandError, print_cart};

/// Reconcile the guest cart into the customer's server cart.
pub async fn run(config: &CartConfig) -> Result<(), CommandError> {
    let token: SecretString = config
        .api
        .token
        .clone()
        .ok_or(CommandError::MissingToken)?;

    let client = CartApiClient::new(&config.api)?;
    let mut session = CartSession::guest(GuestCartStore::open(JsonFileStorage::new(
        &config.guest_cart_path,
    )));

    let report = session.login(&client, token).await?;
    print_report(&report);
    print_cart(session.active());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_report(report: &MergeReport) {
    println!(
        "Merged {} of {} guest line(s)",
        report.merged.len(),
        report.attempted()
    );
    for failure in &report.failures {
        println!(
            "  dropped {} x{}: {}",
            failure.key,
            failure.quantity,
            failure.error.user_message()
        );
    }
    if let Some(error) = &report.refetch_error {
        println!("  server cart could not be reloaded: {error}");
    }
    if let Some(error) = &report.guest_clear_error {
        println!("  guest cart file could not be cleared: {error}");
    }
}
