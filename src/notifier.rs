use std::time::Duration;

use serde_json::json;

use crate::circuit_breaker::{create_notify_circuit_breaker, NotifyCircuitBreaker};
use crate::errors::AppError;
use crate::models::Booking;

/// Client for the external messaging gateway that delivers booking
/// confirmations and status updates to customers.
///
/// Entirely optional: when no gateway is configured the service runs with
/// notifications disabled. Sends are guarded by a circuit breaker so a dead
/// gateway fails fast.
pub struct NotificationGateway {
    client: reqwest::Client,
    base_url: String,
    token: String,
    breaker: NotifyCircuitBreaker,
}

impl NotificationGateway {
    pub fn new(base_url: String, token: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create gateway client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            token,
            breaker: create_notify_circuit_breaker(),
        })
    }

    /// Sends the initial confirmation for a freshly accepted booking.
    pub async fn send_booking_confirmation(&self, booking: &Booking) -> Result<(), AppError> {
        let body = json!({
            "template": "booking_confirmation",
            "recipient_email": booking.customer_email,
            "recipient_phone": booking.customer_phone,
            "booking_id": booking.id,
            "customer_name": booking.customer_name,
            "service": booking.service_name,
            "scheduled_date": booking.scheduled_date,
            "scheduled_time": booking.scheduled_time,
            "address": booking.address,
        });

        self.dispatch(body).await
    }

    /// Notifies the customer that a booking moved to a new lifecycle state.
    pub async fn send_status_update(&self, booking: &Booking) -> Result<(), AppError> {
        let body = json!({
            "template": "booking_status",
            "recipient_email": booking.customer_email,
            "recipient_phone": booking.customer_phone,
            "booking_id": booking.id,
            "customer_name": booking.customer_name,
            "service": booking.service_name,
            "status": booking.status,
            "scheduled_date": booking.scheduled_date,
        });

        self.dispatch(body).await
    }

    async fn dispatch(&self, body: serde_json::Value) -> Result<(), AppError> {
        use failsafe::CircuitBreaker;

        // Fail fast while the breaker is open
        if !self.breaker.is_call_permitted() {
            tracing::warn!("Notification gateway circuit is open; dropping dispatch");
            return Err(AppError::ExternalApiError(
                "Notification gateway circuit is open".to_string(),
            ));
        }

        let result = self.post_message(&body).await;

        // Feed the outcome through the breaker so failures trip it
        match self.breaker.call(move || result) {
            Ok(()) => Ok(()),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(AppError::ExternalApiError(
                "Notification gateway circuit is open".to_string(),
            )),
        }
    }

    async fn post_message(&self, body: &serde_json::Value) -> Result<(), AppError> {
        let url = format!("{}/v1/messages", self.base_url);
        tracing::debug!("Dispatching notification to gateway: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Gateway request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Gateway returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("Notification dispatched");
        Ok(())
    }
}
