use clap::Parser;
use cost_estimator::arguments::Arguments;

#[tokio::main]
async fn main() {
    let args = Arguments::parse();
    if let Err(err) = args.validate() {
        eprintln!("invalid configuration: {err}");
        std::process::exit(1);
    }
    cost_estimator::telemetry::initialize("info", std::env::var("LOG_JSON").is_ok());
    tracing::info!(?args, "starting cost-estimator");

    let matcher = std::sync::Arc::new(cost_estimator::domain::matcher::DefaultMatcher);
    cost_estimator::start(args, matcher).await;
}
