use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use super::ServeFlags;
use crate::core::config::BridgeConfig;
use crate::core::engine::{CliAssistantRunner, TaskEngine};
use crate::core::notify::NotificationRouter;
use crate::core::notify::callback::HttpCallbackChannel;
use crate::core::notify::chat::ChatBusChannel;
use crate::core::registry::TaskRegistry;
use crate::core::status::StatusStoreClient;
use crate::core::terminal::{print_link, print_status};
use crate::interfaces::web::ApiServer;
use crate::logging::BroadcastMakeWriter;

pub async fn run_serve(flags: ServeFlags) -> Result<()> {
    let (log_tx, _) = tokio::sync::broadcast::channel::<String>(500);
    let make_writer = BroadcastMakeWriter {
        sender: log_tx.clone(),
        suppress_stdout: false,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let config = BridgeConfig::load(flags.config_path.as_deref())?;
    info!("Starting taskbridge daemon...");

    let store = Arc::new(StatusStoreClient::new(
        &config.memory.base_url,
        config.memory.token.clone(),
    ));
    let router = Arc::new(NotificationRouter::new(
        Box::new(ChatBusChannel::new(
            config.chat.base_url.clone(),
            config.chat.token.clone(),
        )),
        Box::new(HttpCallbackChannel::new(config.callback.base_url.clone())),
    ));
    let runner = Arc::new(CliAssistantRunner::new(&config.assistant));

    let registry = Arc::new(TaskRegistry::new(Duration::from_secs(
        config.engine.registry_ttl_secs,
    )));
    registry.spawn_sweeper(Duration::from_secs(config.engine.registry_sweep_secs));

    let engine = TaskEngine::new(
        registry,
        store,
        router,
        runner,
        config.engine.clone(),
    );

    print_status("Memory service", &config.memory.base_url);
    print_link(
        "API",
        &format!("http://{}:{}", flags.api_host, flags.api_port),
    );

    let server = ApiServer::new(engine, log_tx, flags.api_host, flags.api_port);
    tokio::select! {
        result = server.serve() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down taskbridge daemon...");
            Ok(())
        }
    }
}
