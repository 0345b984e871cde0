// src/services/notify.rs

//! Push notification dispatch.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{Appointment, PushoverConfig};

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

/// Sink for appointment notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notification for a newly found appointment.
    ///
    /// Delivery is fire-and-forget: implementations log transport failures
    /// and never surface them to the caller.
    async fn notify(&self, appointment: &Appointment);
}

/// Pushover notification channel.
pub struct PushoverNotifier {
    client: Client,
    url: String,
    config: PushoverConfig,
}

impl PushoverNotifier {
    /// Create a notifier for the Pushover message API.
    pub fn new(client: Client, config: PushoverConfig) -> Self {
        Self::with_url(client, PUSHOVER_URL, config)
    }

    /// Create a notifier pointed at a custom endpoint.
    pub fn with_url(client: Client, url: impl Into<String>, config: PushoverConfig) -> Self {
        Self {
            client,
            url: url.into(),
            config,
        }
    }

    async fn send(&self, appointment: &Appointment) -> Result<()> {
        let message = appointment.format(&self.config.message_template, &self.config.title);
        let form = [
            ("message", message.as_str()),
            ("user", self.config.user_key.as_str()),
            ("token", self.config.api_token.as_str()),
        ];
        let response = self.client.post(&self.url).form(&form).send().await?;
        response.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(&self, appointment: &Appointment) {
        if let Err(error) = self.send(appointment).await {
            log::error!(
                "Failed to deliver notification for {} at {}: {}",
                appointment.doctor_name,
                appointment.date,
                error
            );
        }
    }
}
