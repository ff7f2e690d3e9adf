use tracing::{error, info};

use teahouse::{Config, Database, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = teahouse::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        teahouse::logging::init_console_only(&config.logging.level);
    }

    info!("Teahouse - news and blog backend");

    let db = match Database::open(&config.database.path, config.database.max_connections).await {
        Ok(db) => db,
        Err(e) => {
            error!(path = %config.database.path, error = %e, "Failed to open database");
            std::process::exit(1);
        }
    };

    let server = match WebServer::new(&config, db) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Invalid server configuration");
            std::process::exit(1);
        }
    };

    // `teahouse grant-master <username>` promotes an account and exits
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [command, username] = args.as_slice() {
        if command == "grant-master" {
            match server.state().accounts.grant_master(username).await {
                Ok(()) => info!(username = %username, "Granted master"),
                Err(e) => {
                    error!(username = %username, error = %e, "Failed to grant master");
                    std::process::exit(1);
                }
            }
            return;
        }
    }

    if let Err(e) = server.run().await {
        error!(error = %e, "Web server error");
        std::process::exit(1);
    }
}
