mod config;
mod repos;
mod services;
mod system;

pub use config::{Config, DefaultReminderDays, NotificationWebhookConfig};
pub use repos::{
    DeleteResult, IReminderRepo, ISubjectRepo, InMemoryReminderRepo, InMemorySubjectRepo,
    MongoReminderRepo, MongoSubjectRepo, Repos,
};
pub use services::*;
use std::sync::Arc;
pub use system::{ISys, ManualSys, RealSys};
use tracing::{info, warn};

#[derive(Clone)]
pub struct ObligationsContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub notifier: Arc<dyn INotificationSender>,
}

struct ContextParams {
    pub mongodb_connection_string: String,
    pub mongodb_db_name: String,
}

impl ObligationsContext {
    async fn create(params: ContextParams) -> anyhow::Result<Self> {
        let config = Config::new();
        let repos = Repos::create_mongodb(
            &params.mongodb_connection_string,
            &params.mongodb_db_name,
            config.business_utc_offset_minutes,
        )
        .await?;
        let notifier = create_notifier(&config)?;
        Ok(Self {
            repos,
            config,
            sys: Arc::new(RealSys {}),
            notifier,
        })
    }

    /// Context backed by in-memory repos which only logs notifications
    pub fn create_inmemory() -> Self {
        Self {
            repos: Repos::create_inmemory(),
            config: Config::default(),
            sys: Arc::new(RealSys {}),
            notifier: Arc::new(LogNotificationSender {}),
        }
    }
}

fn create_notifier(config: &Config) -> anyhow::Result<Arc<dyn INotificationSender>> {
    match &config.notification_webhook {
        Some(webhook) => {
            info!("Sending notifications to webhook: {}", webhook.url);
            Ok(Arc::new(WebhookNotificationSender::new(webhook.clone())?))
        }
        None => {
            warn!("NOTIFICATION_WEBHOOK_URL is not set, notifications will only be logged.");
            Ok(Arc::new(LogNotificationSender {}))
        }
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> anyhow::Result<ObligationsContext> {
    const MONGODB_CONNECTION_STRING: &str = "MONGODB_CONNECTION_STRING";
    const MONGODB_NAME: &str = "MONGODB_NAME";

    match std::env::var(MONGODB_CONNECTION_STRING) {
        Ok(mongodb_connection_string) => {
            let mongodb_db_name =
                std::env::var(MONGODB_NAME).unwrap_or_else(|_| "obligations".to_string());
            info!("{} env var was provided. Going to use MongoDB.", MONGODB_CONNECTION_STRING);
            ObligationsContext::create(ContextParams {
                mongodb_connection_string,
                mongodb_db_name,
            })
            .await
        }
        Err(_) => {
            warn!(
                "{} env var was not provided. Going to use inmemory infra. This should only be used during testing!",
                MONGODB_CONNECTION_STRING
            );
            let config = Config::new();
            let notifier = create_notifier(&config)?;
            Ok(ObligationsContext {
                repos: Repos::create_inmemory(),
                config,
                sys: Arc::new(RealSys {}),
                notifier,
            })
        }
    }
}
