use std::sync::Arc;

use botbridge::auth::AuthGate;
use botbridge::bus::{MessageBus, ReceivedEvent};
use botbridge::cards::{CardSynthesizer, StaticCatalog};
use botbridge::channels::{StrategyRegistry, TeamsStrategy, TextStrategy};
use botbridge::config::Settings;
use botbridge::connector::{Connector, HttpConnector};
use botbridge::directory::UserDirectory;
use botbridge::dispatch::Dispatcher;
use botbridge::error::DispatchError;
use botbridge::webhook::{WebhookState, webhook_routes};

/// Stand-in bus consumer that logs every translated event. Real
/// deployments construct the [`Dispatcher`] with their own bus.
struct LoggingBus;

#[async_trait::async_trait]
impl MessageBus for LoggingBus {
    async fn deliver(&self, event: ReceivedEvent) -> Result<(), DispatchError> {
        tracing::info!(user = %event.user().id, text = ?event.text(), "event handed to bus");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let settings = Settings::from_env()?;

    let directory = Arc::new(UserDirectory::new());
    if settings.enable_auth {
        // Seeded under one shared tenant key; authorization checks
        // span all tenants.
        directory.seed_admins("default", &settings.admin_object_ids);
    }

    let connector: Arc<dyn Connector> = Arc::new(HttpConnector::new(
        settings.app_id.clone(),
        settings.app_password.clone(),
    ));

    let mut registry = StrategyRegistry::new();
    registry.register(
        "msteams",
        Arc::new(TeamsStrategy::new(
            settings.bot_name.clone(),
            settings.tenant_allowlist.clone(),
            Arc::clone(&directory),
            Arc::clone(&connector),
            CardSynthesizer::new(Arc::new(StaticCatalog::default())),
        )),
    );
    for name in ["webchat", "directline", "emulator"] {
        registry.register(name, Arc::new(TextStrategy::new(Arc::clone(&directory))));
    }

    let gate = AuthGate::new(settings.enable_auth, Arc::clone(&directory));
    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        gate,
        Arc::new(LoggingBus),
        connector,
        settings.bot_name.clone(),
    ));

    let app = webhook_routes(&settings.route, WebhookState { dispatcher });
    let addr = format!("0.0.0.0:{}", settings.port);
    tracing::info!(%addr, route = %settings.route, bot = %settings.bot_name, "webhook listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
