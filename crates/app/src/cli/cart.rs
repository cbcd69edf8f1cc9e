use clap::{Args, Subcommand};

use davenport_app::{
    api::{HttpStorefrontApi, StorefrontApi},
    config::StorefrontConfig,
};

#[derive(Debug, Args)]
pub(crate) struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Show the current cart with its priced lines
    Show(ShowCartArgs),
}

#[derive(Debug, Args)]
struct ShowCartArgs {
    #[command(flatten)]
    config: StorefrontConfig,
}

pub(crate) async fn run(command: CartCommand) -> Result<(), String> {
    match command.command {
        CartSubcommand::Show(args) => show(args).await,
    }
}

async fn show(args: ShowCartArgs) -> Result<(), String> {
    let api = HttpStorefrontApi::new(&args.config)
        .map_err(|error| format!("failed to build storefront client: {error}"))?;

    let snapshot = api
        .fetch_cart()
        .await
        .map_err(|error| format!("failed to fetch cart: {error}"))?;

    println!("cart_id: {}", snapshot.uuid);

    for line in snapshot.cart.iter() {
        let line_total = line
            .line_total()
            .map_err(|error| format!("failed to total line: {error}"))?;

        println!(
            "{} x{} @ {} = {}",
            line.name(),
            line.quantity(),
            line.unit_price(),
            line_total
        );
    }

    let subtotal = snapshot
        .cart
        .subtotal()
        .map_err(|error| format!("failed to total cart: {error}"))?;

    println!("subtotal: {subtotal}");

    Ok(())
}
