use clap::{Parser, Subcommand};

mod cart;
mod checkout;

#[derive(Debug, Parser)]
#[command(name = "davenport", about = "Davenport storefront checkout CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Cart(cart::CartCommand),
    Checkout(checkout::CheckoutCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Cart(command) => cart::run(command).await,
            Commands::Checkout(command) => checkout::run(command).await,
        }
    }
}
