#[macro_use] extern crate log;

pub mod config;
pub mod context;
pub mod form;
pub mod handlers;
pub mod logger;
pub mod request;
pub mod response;
pub mod server;
pub mod store;
pub mod utils;

use clap::Parser;

use crate::config::Config;
use crate::server::Server;
use crate::store::UserStore;
use crate::utils::ResultV;


const MODULE: &str = "MAIN";

/// Minimal HTTP server with an in-memory user administration panel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the configurational file, built-in defaults are used without it
    config_fn: Option<String>,
}


fn main() -> ResultV {
    let args = Args::parse();
    let cfg = Config::load(args.config_fn.as_deref())?;
    logger::init_logger(&cfg.log)?;

    let workers = cfg.server.workers;
    let server = Server::bind(cfg, UserStore::seeded())?;
    let addr = server.local_addr()?;
    let shared = server.store();
    let users = store::lock(&shared)?.len();

    info!("[{}] Starting userdesk service at {} with {} workers", MODULE, addr, workers);
    info!("[{}] User store seeded with {} accounts", MODULE, users);
    match &args.config_fn {
        Some(path) => info!("[{}] Config loaded from {}", MODULE, path),
        None => info!("[{}] No config file given, using defaults", MODULE),
    }

    server.run();
    Ok(())
}
