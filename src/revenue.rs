//! Monthly revenue rollup over completed bookings.

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::Datelike;

use crate::models::{Booking, MonthlyRevenue, STATUS_COMPLETED};

/// Buckets completed bookings by calendar month of their scheduled date.
///
/// Missing amounts count as zero; non-completed bookings are skipped entirely.
/// Output is sorted newest month first.
pub fn monthly_revenue(bookings: &[Booking]) -> Vec<MonthlyRevenue> {
    let mut buckets: HashMap<(i32, u32), MonthlyRevenue> = HashMap::new();

    for booking in bookings {
        if booking.status != STATUS_COMPLETED {
            continue;
        }
        let key = (
            booking.scheduled_date.year(),
            booking.scheduled_date.month(),
        );
        let entry = buckets.entry(key).or_insert_with(|| MonthlyRevenue {
            year: key.0,
            month: key.1,
            total: BigDecimal::from(0),
            completed_bookings: 0,
        });
        entry.total += booking
            .total_amount
            .clone()
            .unwrap_or_else(|| BigDecimal::from(0));
        entry.completed_bookings += 1;
    }

    let mut months: Vec<MonthlyRevenue> = buckets.into_values().collect();
    months.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
    months
}
