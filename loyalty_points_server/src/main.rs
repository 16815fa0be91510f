use dotenvy::dotenv;
use log::{error, warn};
use loyalty_points_server::{config::ServerConfig, server::run_server};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    let config = ServerConfig::load();
    init_logging(&config.log_level);

    if config.secret.reveal().is_empty() {
        warn!("🚦️ SECRET is empty. Auth tokens will be signed with an empty key - set a proper one in production.");
    }
    if config.database_url.is_empty() {
        error!("🚦️ DATABASE_URI is not set. The gateway cannot run without its database.");
        std::process::exit(1);
    }

    if let Err(e) = run_server(config).await {
        error!("🚀️ Server terminated with error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    env_logger::Builder::new().parse_filters(level).init();
}
