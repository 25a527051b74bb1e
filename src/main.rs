use log::{error, info};
use tzsp_exporter::configuration::config::Config;
use tzsp_exporter::controller::controller_handler::Controller;

#[tokio::main]
async fn main() {
    // Override with RUST_LOG, e.g. RUST_LOG=debug
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    info!("tzsp-exporter v{}", env!("CARGO_PKG_VERSION"));
    info!("Importing configuration");

    let config = match Config::from_args() {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration imported successfully");

    let mut controller = Controller::new(config);
    if let Err(e) = controller.run().await {
        error!("Exporter stopped with an error: {}, exiting...", e);
        std::process::exit(1);
    }
}
