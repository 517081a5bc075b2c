use dotenvy::dotenv;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use spott_server::config::Config;
use spott_server::routes::create_routes;
use spott_server::seed;
use spott_server::state::AppState;
use spott_server::store::Store;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let store = Store::new();

    if config.demo_seed {
        seed::load_demo_events(&store);
        tracing::info!("Demo events loaded");
    }

    let app = create_routes(AppState::new(store));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Spott API running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
