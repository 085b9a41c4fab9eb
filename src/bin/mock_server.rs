use std::net::{IpAddr, SocketAddr};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;

use budgeteur_client::{
    logging::{init_logging, logging_middleware},
    mock_server::{DEMO_EMAIL, DEMO_PASSWORD, MemoryStore, MockState, build_router, graceful_shutdown},
};

/// An in-memory budgeting REST API for developing and testing the client.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The address to serve the API from.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Start with sample accounts, budgets, transactions and goals.
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() {
    init_logging("info");

    let args = Args::parse();
    let addr = SocketAddr::new(args.host, args.port);

    let store = if args.seed {
        MemoryStore::seeded()
    } else {
        MemoryStore::new()
    };
    let router = build_router(MockState::new(store))
        .layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    tracing::info!("Mock server listening on http://{addr}");
    tracing::info!("Log in with {DEMO_EMAIL} and password {DEMO_PASSWORD}");

    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server stopped with an error: {error}");
        std::process::exit(1);
    }
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged by the handlers, so the default 5xx logging is off.
        .on_failure(());

    router.layer(tracing_layer)
}
