use std::sync::Arc;

use clap::{Args, ValueEnum};
use uuid::Uuid;

use davenport::payments::PaymentMethod;
use davenport_app::{
    api::HttpStorefrontApi,
    checkout::{CheckoutError, CheckoutFlow, Navigator, SubmitOutcome, VoucherOutcome},
    config::StorefrontConfig,
};

#[derive(Debug, Args)]
pub(crate) struct CheckoutCommand {
    #[command(flatten)]
    config: StorefrontConfig,

    /// Shipping address UUID; the default address is used when omitted
    #[arg(long)]
    address: Option<Uuid>,

    /// Voucher code to apply before submitting
    #[arg(long)]
    voucher: Option<String>,

    /// Payment method; chosen from the eligible set when omitted
    #[arg(long, value_enum)]
    method: Option<MethodArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    /// Cash on delivery
    Cod,

    /// VNPAY online gateway
    Vnpay,
}

impl From<MethodArg> for PaymentMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Cod => Self::CashOnDelivery,
            MethodArg::Vnpay => Self::VnPay,
        }
    }
}

/// Prints the gateway URL instead of opening a browser.
#[derive(Debug)]
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn open_external(&self, url: &str) {
        println!("complete the payment at: {url}");
    }
}

pub(crate) async fn run(command: CheckoutCommand) -> Result<(), String> {
    let currency = command
        .config
        .resolve_currency()
        .ok_or_else(|| format!("unknown currency code: {}", command.config.currency))?;

    let policy = command.config.payment_policy(currency);

    let api = HttpStorefrontApi::new(&command.config)
        .map_err(|error| format!("failed to build storefront client: {error}"))?;

    let flow = CheckoutFlow::new(Arc::new(api), Arc::new(ConsoleNavigator), policy);

    let quote = flow
        .load()
        .await
        .map_err(|error| format!("failed to load checkout: {error}"))?;

    println!("cart subtotal: {}", quote.subtotal);

    let addresses = flow.addresses();

    let chosen = command
        .address
        .or_else(|| {
            addresses
                .iter()
                .find(|address| address.is_default)
                .or_else(|| addresses.first())
                .map(|address| address.uuid)
        })
        .ok_or_else(|| "no shipping address on file; add one first".to_string())?;

    flow.select_address(chosen)
        .map_err(|error| format!("failed to select address: {error}"))?;

    if let Some(address) = addresses.iter().find(|address| address.uuid == chosen) {
        println!("shipping to: {} ({})", address.summary(), address.recipient);
    }

    if let Some(code) = &command.voucher {
        match flow
            .apply_voucher(code)
            .await
            .map_err(|error| format!("voucher lookup failed: {error}"))?
        {
            VoucherOutcome::Applied { quote } => {
                println!("voucher {code} applied: -{}", quote.discount);
            }
            VoucherOutcome::Rejected { rejection, .. } => {
                // Recoverable: the order proceeds without the voucher.
                println!("voucher not applied: {rejection}");
            }
            VoucherOutcome::Superseded => {}
        }
    }

    if let Some(method) = command.method {
        match flow.select_method(method.into()) {
            Ok(_) => {}
            Err(CheckoutError::MethodNotEligible { method }) => {
                return Err(format!("{method} is not available for this order total"));
            }
            Err(error) => return Err(format!("failed to select payment method: {error}")),
        }
    }

    let quote = flow
        .quote()
        .map_err(|error| format!("failed to price checkout: {error}"))?;

    if quote.method_switched {
        println!("note: payment method switched to {}", quote.method);
    }

    println!("total: {} via {}", quote.total, quote.method);

    match flow
        .submit()
        .await
        .map_err(|error| format!("checkout failed: {error}"))?
    {
        SubmitOutcome::Confirmed(order) => {
            println!("order {} confirmed, settle on delivery", order.code);
        }
        SubmitOutcome::RedirectedToGateway { .. } => {
            // ConsoleNavigator already printed the gateway URL.
        }
    }

    Ok(())
}
