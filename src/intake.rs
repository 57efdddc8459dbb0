//! Public booking intake: validation, duplicate suppression, insert, and
//! fire-and-forget confirmation dispatch.
//!
//! The workflow for `POST /api/v1/bookings`:
//! 1. Validate the submitted fields
//! 2. Reject recent duplicate submissions (double-click / double-POST)
//! 3. Insert the booking row with status `pending`
//! 4. Dispatch a confirmation through the gateway, off the request path

use std::sync::Arc;

use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{Booking, CreateBookingRequest, STATUS_PENDING};

/// Validate email address
///
/// Checks for:
/// - Basic email format (contains @ and .)
/// - Fake/placeholder patterns (repeated digits like 9999, 1111)
/// - Minimum length requirements
/// - Valid domain structure
pub fn is_valid_email(email: &str) -> bool {
    // Basic checks
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // Detect throwaway form-filler patterns (repeated digits)
    let fake_patterns = ["999999", "111111", "000000", "123456789"];

    for pattern in &fake_patterns {
        if email.contains(pattern) {
            tracing::warn!("Rejected email (fake pattern '{}'): {}", pattern, email);
            return false;
        }
    }

    // RFC 5322 simplified email regex
    // Matches: local@domain.tld
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    if !email_regex.is_match(email) {
        tracing::warn!("Rejected email (format): {}", email);
        return false;
    }

    true
}

/// Parses a two-letter country code into a phonenumber region.
pub fn parse_region(code: &str) -> Option<CountryId> {
    code.to_uppercase().parse::<CountryId>().ok()
}

/// Validate and normalize a phone number for the given region.
///
/// Parses with the region as the default country, validates, and returns the
/// normalized E.164 form (e.g. +14155552671).
///
/// Returns: (is_valid, normalized_phone_or_error_msg)
pub fn validate_phone(raw: &str, region: CountryId) -> (bool, String) {
    // Skip empty or very short strings
    if raw.trim().is_empty() || raw.len() < 8 {
        return (false, "Phone too short".to_string());
    }

    match phonenumber::parse(Some(region), raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("Valid phone: {} -> {}", raw, formatted);
                (true, formatted)
            } else {
                tracing::warn!("Invalid phone number for region {:?}: {}", region, raw);
                (false, "Invalid phone number".to_string())
            }
        }
        Err(e) => {
            tracing::warn!("Failed to parse phone '{}': {:?}", raw, e);
            (false, format!("Parse error: {:?}", e))
        }
    }
}

/// Duplicate-suppression key for a submission: strongest contact identifier
/// plus the slot being booked.
pub fn dedup_key(req: &CreateBookingRequest) -> String {
    let contact = req
        .customer_email
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_lowercase)
        .or_else(|| {
            req.customer_phone
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| req.customer_name.trim().to_lowercase());

    format!(
        "{}:{}:{}",
        contact,
        req.scheduled_date,
        req.service_name.trim().to_lowercase()
    )
}

fn require_non_blank(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

/// Validates a booking submission, normalizing the phone in place.
pub fn validate_booking_request(
    req: &mut CreateBookingRequest,
    region: CountryId,
) -> Result<(), AppError> {
    require_non_blank(&req.customer_name, "customer_name")?;
    require_non_blank(&req.address, "address")?;
    require_non_blank(&req.service_name, "service_name")?;

    if let Some(email) = req.customer_email.as_deref() {
        if !email.trim().is_empty() && !is_valid_email(email.trim()) {
            return Err(AppError::BadRequest(format!(
                "Invalid email address: {}",
                email
            )));
        }
    }

    if let Some(phone) = req.customer_phone.clone() {
        if !phone.trim().is_empty() {
            let (valid, normalized) = validate_phone(&phone, region);
            if !valid {
                return Err(AppError::BadRequest(format!(
                    "Invalid phone number: {}",
                    phone
                )));
            }
            req.customer_phone = Some(normalized);
        } else {
            req.customer_phone = None;
        }
    }

    Ok(())
}

/// Complete intake workflow for a public booking submission.
pub async fn intake_booking(
    state: Arc<AppState>,
    mut req: CreateBookingRequest,
) -> Result<Booking, AppError> {
    let region = parse_region(&state.config.default_phone_region).ok_or_else(|| {
        AppError::InternalError(format!(
            "Unknown phone region: {}",
            state.config.default_phone_region
        ))
    })?;

    validate_booking_request(&mut req, region)?;

    // Duplicate suppression window
    let key = dedup_key(&req);
    if state.recent_booking_cache.get(&key).await.is_some() {
        tracing::info!("Duplicate booking submission suppressed: {}", key);
        return Err(AppError::Conflict(
            "A matching booking was just submitted; please wait a moment".to_string(),
        ));
    }
    state
        .recent_booking_cache
        .insert(key.clone(), chrono::Utc::now().timestamp())
        .await;

    let inserted = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (
            id, customer_name, customer_email, customer_phone, user_id,
            service_id, service_name, scheduled_date, scheduled_time,
            address, notes, total_amount, status, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.customer_name.trim())
    .bind(req.customer_email.as_deref().map(str::trim))
    .bind(&req.customer_phone)
    .bind(req.user_id)
    .bind(req.service_id)
    .bind(req.service_name.trim())
    .bind(req.scheduled_date)
    .bind(&req.scheduled_time)
    .bind(req.address.trim())
    .bind(&req.notes)
    .bind(&req.total_amount)
    .bind(STATUS_PENDING)
    .fetch_one(&state.db)
    .await;

    let booking = match inserted {
        Ok(booking) => booking,
        Err(e) => {
            // A failed insert must not lock the customer out for the TTL
            state.recent_booking_cache.invalidate(&key).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        "Booking accepted: {} for {} on {}",
        booking.id,
        booking.customer_name,
        booking.scheduled_date
    );

    // New booking changes the customer rollup
    state.summary_cache.invalidate("all").await;

    spawn_confirmation_dispatch(&state, booking.clone());

    Ok(booking)
}

/// Dispatches the confirmation off the request path. Send failures are
/// logged, never surfaced to the submitting customer.
pub fn spawn_confirmation_dispatch(state: &Arc<AppState>, booking: Booking) {
    let Some(notifier) = state.notifier.clone() else {
        tracing::debug!("Notifications disabled; skipping confirmation dispatch");
        return;
    };

    tokio::spawn(async move {
        if let Err(e) = notifier.send_booking_confirmation(&booking).await {
            tracing::warn!(
                "Failed to send confirmation for booking {}: {}",
                booking.id,
                e
            );
        }
    });
}

/// Dispatches a status-update notification off the request path.
pub fn spawn_status_dispatch(state: &Arc<AppState>, booking: Booking) {
    let Some(notifier) = state.notifier.clone() else {
        return;
    };

    tokio::spawn(async move {
        if let Err(e) = notifier.send_status_update(&booking).await {
            tracing::warn!(
                "Failed to send status update for booking {}: {}",
                booking.id,
                e
            );
        }
    });
}
