use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use pledge_client::api::CampaignId;
use pledge_mock_server::{router, MockServer};
use tokio::sync::Mutex;

const DEFAULT_ADDR: &str = "127.0.0.1:3001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let addr = std::env::var("PLEDGE_MOCK_ADDR").unwrap_or_else(|_| String::from(DEFAULT_ADDR));
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("parsing listen address {addr:?}"))?;
    let campaign = CampaignId::new(
        std::env::var("PLEDGE_MOCK_CAMPAIGN").unwrap_or_else(|_| String::from("demo")),
    );

    let mut server = MockServer::new();
    server.seed_demo(&campaign, 24);
    let (_, token) = server.admin_create_user("Demo", "User");
    println!("campaign {campaign} seeded, use PLEDGE_TOKEN={}", token.0);

    let app = router(Arc::new(Mutex::new(server)));
    tracing::info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}
