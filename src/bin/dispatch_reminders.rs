use clap::Parser;
use obligations::{
    invocation::{run_once, DispatchArgs},
    telemetry::{get_subscriber, init_subscriber},
};
use obligations_infra::setup_context;
use tracing::error;

/// Single dispatcher pass, meant to be run from cron.
/// Exits with a non zero status if the pass could not be completed.
#[actix_web::main]
async fn main() {
    openssl_probe::init_ssl_cert_env_vars();
    let args = DispatchArgs::parse();

    let subscriber = get_subscriber("dispatch_reminders".into(), "info".into());
    if let Err(e) = init_subscriber(subscriber) {
        eprintln!("Unable to initialize logging: {:?}", e);
        std::process::exit(1);
    }

    let context = match setup_context().await {
        Ok(context) => context,
        Err(e) => {
            error!("Unable to set up context: {:?}", e);
            std::process::exit(1);
        }
    };

    std::process::exit(run_once(&context, args).await);
}
