//! Terminal client for the Niwot multiplayer quiz.
//!
//! Logs in over REST, opens the WebSocket event channel and runs the session
//! until the user quits. The channel reconnects on its own (max 5 attempts
//! with a 5 second interval) and the session re-joins its room afterwards.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin niwot-client -- --api-base http://127.0.0.1:3000 \
//!     --ws-base ws://127.0.0.1:3000/ws -e alice@example.com -p secret
//! ```

use std::sync::Arc;

use clap::Parser;

use niwot_client::{
    config::Args,
    error::ClientError,
    formatter::MessageFormatter,
    infrastructure::{
        api::{HttpApi, RoomApi},
        transport::{WebSocketConfig, WebSocketTransport, event_queue},
    },
    session::{SessionCoordinator, SessionInput, SessionRunner},
};
use niwot_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    if let Err(e) = run(args).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ClientError> {
    let endpoints = args.endpoints()?;
    let api = Arc::new(HttpApi::new(endpoints.api_base.clone())?);

    let auth = match &args.register {
        Some(username) => api.register(username, &args.email, &args.password).await?,
        None => api.login(&args.email, &args.password).await?,
    };
    let clock = Arc::new(SystemClock);
    print!(
        "{}",
        MessageFormatter::format_logged_in(&auth.user, clock.now_millis())
    );

    let (producer, queue) = event_queue::<SessionInput>();
    let config = WebSocketConfig::new(endpoints.ws_base).with_bearer_token(auth.token);
    let transport = Arc::new(WebSocketTransport::connect(config, producer.clone()));

    let mut coordinator = SessionCoordinator::new(transport, clock, endpoints.api_base);
    coordinator.on_logged_in(auth.user);

    SessionRunner::new(coordinator, api, producer, queue)
        .run()
        .await;

    tracing::info!("Client session ended normally");
    Ok(())
}
