//! Customer rollup: folds the flat booking history into one summary per
//! distinct customer, joining registered profiles and loyalty balances.
//!
//! This is the single canonical aggregation behind `GET /api/v1/customers`;
//! the lookup endpoint reuses the same fold so the two views cannot drift.

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::models::{
    Booking, CustomerSummary, LoyaltyPoints, RegistrationStatus, UserProfile,
};

/// Identity key for one aggregation bucket.
///
/// Derivation is a fixed three-way fallback: prefer the booking's email, then
/// the customer name, then the booking's own id. Email and name are lowercased
/// so casing differences collapse into one bucket; blank strings count as
/// absent. Two email-less, name-less bookings therefore never merge - each is
/// its own customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CustomerKey {
    Email(String),
    Name(String),
    Booking(Uuid),
}

impl CustomerKey {
    pub fn derive(booking: &Booking) -> Self {
        if let Some(email) = non_blank(booking.customer_email.as_deref()) {
            return CustomerKey::Email(email.to_lowercase());
        }
        if let Some(name) = non_blank(Some(&booking.customer_name)) {
            return CustomerKey::Name(name.to_lowercase());
        }
        CustomerKey::Booking(booking.id)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Finds the registered profile behind a booking: by account reference first,
/// then by case-insensitive full-name equality.
fn match_profile<'a>(booking: &Booking, profiles: &'a [UserProfile]) -> Option<&'a UserProfile> {
    if let Some(user_id) = booking.user_id {
        if let Some(profile) = profiles.iter().find(|p| p.id == user_id) {
            return Some(profile);
        }
    }
    let name = booking.customer_name.trim();
    if name.is_empty() {
        return None;
    }
    profiles
        .iter()
        .find(|p| p.full_name.trim().eq_ignore_ascii_case(name))
}

fn points_for(profile: &UserProfile, points: &[LoyaltyPoints]) -> i64 {
    points
        .iter()
        .find(|p| p.user_id == profile.id)
        .map(|p| p.points)
        .unwrap_or(0)
}

fn amount_or_zero(booking: &Booking) -> BigDecimal {
    booking
        .total_amount
        .clone()
        .unwrap_or_else(|| BigDecimal::from(0))
}

/// Folds bookings into one [`CustomerSummary`] per distinct [`CustomerKey`].
///
/// Single synchronous pass; the output carries no ordering guarantee, display
/// order is the caller's concern. Invariants:
///
/// - one summary per distinct derived key;
/// - `total_spent` sums the bucket's amounts, missing amounts as zero;
/// - `last_booking_date` is the bucket's maximum scheduled date;
/// - a bucket is `Registered` as soon as any of its bookings resolves a
///   profile (by id or case-insensitive name), with that profile's loyalty
///   points attached; otherwise `Guest` with 0 points.
pub fn summarize_customers(
    bookings: &[Booking],
    profiles: &[UserProfile],
    points: &[LoyaltyPoints],
) -> Vec<CustomerSummary> {
    let mut buckets: HashMap<CustomerKey, CustomerSummary> = HashMap::new();

    for booking in bookings {
        let key = CustomerKey::derive(booking);
        match buckets.get_mut(&key) {
            None => {
                let matched = match_profile(booking, profiles);
                buckets.insert(
                    key,
                    CustomerSummary {
                        name: booking.customer_name.clone(),
                        email: non_blank(booking.customer_email.as_deref())
                            .map(str::to_string),
                        phone: non_blank(booking.customer_phone.as_deref())
                            .map(str::to_string),
                        total_bookings: 1,
                        total_spent: amount_or_zero(booking),
                        last_booking_date: Some(booking.scheduled_date),
                        registration: match matched {
                            Some(_) => RegistrationStatus::Registered,
                            None => RegistrationStatus::Guest,
                        },
                        loyalty_points: matched.map(|p| points_for(p, points)).unwrap_or(0),
                    },
                );
            }
            Some(summary) => {
                summary.total_bookings += 1;
                summary.total_spent += amount_or_zero(booking);
                if summary
                    .last_booking_date
                    .map(|d| booking.scheduled_date > d)
                    .unwrap_or(true)
                {
                    summary.last_booking_date = Some(booking.scheduled_date);
                }
                if summary.email.is_none() {
                    summary.email =
                        non_blank(booking.customer_email.as_deref()).map(str::to_string);
                }
                if summary.phone.is_none() {
                    summary.phone =
                        non_blank(booking.customer_phone.as_deref()).map(str::to_string);
                }
                if summary.registration == RegistrationStatus::Guest {
                    if let Some(profile) = match_profile(booking, profiles) {
                        summary.registration = RegistrationStatus::Registered;
                        summary.loyalty_points = points_for(profile, points);
                    }
                }
            }
        }
    }

    buckets.into_values().collect()
}

/// Picks the single bucket matching an email or name, for the lookup endpoint.
pub fn find_summary(
    summaries: Vec<CustomerSummary>,
    email: Option<&str>,
    name: Option<&str>,
) -> Option<CustomerSummary> {
    summaries.into_iter().find(|s| {
        if let Some(wanted) = non_blank(email) {
            return s
                .email
                .as_deref()
                .map(|e| e.eq_ignore_ascii_case(wanted))
                .unwrap_or(false);
        }
        if let Some(wanted) = non_blank(name) {
            return s.name.trim().eq_ignore_ascii_case(wanted);
        }
        false
    })
}

/// True when the booking belongs to the same customer bucket as the lookup
/// identifiers; used to list one customer's bookings alongside their summary.
pub fn booking_matches(booking: &Booking, email: Option<&str>, name: Option<&str>) -> bool {
    if let Some(wanted) = non_blank(email) {
        return booking
            .customer_email
            .as_deref()
            .map(|e| e.eq_ignore_ascii_case(wanted))
            .unwrap_or(false);
    }
    if let Some(wanted) = non_blank(name) {
        return booking.customer_name.trim().eq_ignore_ascii_case(wanted);
    }
    false
}
