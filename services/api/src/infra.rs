use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use proposal_flow::config::CollaboratorConfig;
use proposal_flow::workflows::proposals::{EmailMessage, NotificationSettings, Notifier};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Mail transport used by the service binary. Without a mailer credential it
/// logs the message instead of delivering it, so local runs still show what
/// would have gone out.
pub(crate) struct ConsoleNotifier {
    enabled: bool,
}

impl ConsoleNotifier {
    pub(crate) fn from_config(config: &CollaboratorConfig) -> Self {
        Self {
            enabled: config.mailer_api_key.is_some(),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn send(&self, message: &EmailMessage) -> bool {
        if self.enabled {
            tracing::info!(
                subject = %message.subject,
                recipients = message.to.len(),
                attachments = message.attachments.len(),
                "dispatching email"
            );
            true
        } else {
            tracing::info!(
                subject = %message.subject,
                "email suppressed: SENDGRID_API_KEY not set"
            );
            false
        }
    }
}

pub(crate) fn notification_settings(config: &CollaboratorConfig) -> NotificationSettings {
    NotificationSettings {
        admin_email: config.admin_email.clone(),
        from_email: config.from_email.clone(),
        public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
    }
}
