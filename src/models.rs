use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Booking lifecycle ============

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

/// The fixed set of booking lifecycle labels. Stored as text so the set can
/// grow without a schema migration.
pub const BOOKING_STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_CONFIRMED,
    STATUS_IN_PROGRESS,
    STATUS_COMPLETED,
    STATUS_CANCELLED,
];

pub fn is_valid_booking_status(status: &str) -> bool {
    BOOKING_STATUSES.contains(&status)
}

pub const INSPECTION_SCHEDULED: &str = "scheduled";
pub const INSPECTION_COMPLETED: &str = "completed";
pub const INSPECTION_CANCELLED: &str = "cancelled";

pub const INSPECTION_STATUSES: &[&str] = &[
    INSPECTION_SCHEDULED,
    INSPECTION_COMPLETED,
    INSPECTION_CANCELLED,
];

pub fn is_valid_inspection_status(status: &str) -> bool {
    INSPECTION_STATUSES.contains(&status)
}

// ============ Database Models ============

/// A scheduled service request tied to a customer.
///
/// Bookings are inserted by the public intake endpoint, mutated only through
/// targeted status updates, and never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier for the booking.
    pub id: Uuid,
    /// Customer name as submitted on the booking form.
    pub customer_name: String,
    /// Customer email, if provided.
    pub customer_email: Option<String>,
    /// Customer phone in E.164 form, if provided.
    pub customer_phone: Option<String>,
    /// Registered user account reference, if the booking came from a logged-in customer.
    pub user_id: Option<Uuid>,
    /// Service catalog reference, if the form selected a known offering.
    pub service_id: Option<Uuid>,
    /// Service name as displayed to the customer.
    pub service_name: String,
    /// Date the cleaning is scheduled for.
    pub scheduled_date: NaiveDate,
    /// Time slot label (e.g. "09:00-11:00").
    pub scheduled_time: Option<String>,
    /// Service address.
    pub address: String,
    /// Free-form customer notes.
    pub notes: Option<String>,
    /// Quoted total, when priced at submission time.
    pub total_amount: Option<BigDecimal>,
    /// Lifecycle label, one of [`BOOKING_STATUSES`].
    pub status: String,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A registered customer account.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique identifier for the profile.
    pub id: Uuid,
    /// Full name.
    pub full_name: String,
    /// Account email.
    pub email: String,
    /// Phone number, if provided.
    pub phone: Option<String>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
}

/// Loyalty points balance for a registered user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LoyaltyPoints {
    /// Registered user this balance belongs to.
    pub user_id: Uuid,
    /// Current points balance.
    pub points: i64,
    /// Timestamp of last update.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A service offering in the catalog (e.g. "Deep Clean", "Move-out Clean").
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ServiceOffering {
    /// Unique identifier for the offering.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Customer-facing description.
    pub description: Option<String>,
    /// Base price.
    pub price: BigDecimal,
    /// Expected duration in minutes.
    pub duration_minutes: i32,
    /// Whether the offering is currently bookable.
    pub active: bool,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A cleaning crew member or office employee.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: Uuid,
    /// Full name.
    pub full_name: String,
    /// Work email.
    pub email: String,
    /// Phone number, if provided.
    pub phone: Option<String>,
    /// Role label (e.g. "cleaner", "supervisor", "office").
    pub role: String,
    /// Whether the employee is currently active.
    pub active: bool,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A consumable supply item tracked in stock.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StockItem {
    /// Unique identifier for the stock item.
    pub id: Uuid,
    /// Item name.
    pub name: String,
    /// Units on hand.
    pub quantity: i32,
    /// Unit of measure (e.g. "bottle", "box").
    pub unit: String,
    /// Quantity at which a reorder is due.
    pub reorder_level: i32,
    /// Preferred vendor, if any.
    pub vendor_id: Option<Uuid>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A supplier of cleaning materials.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Vendor {
    /// Unique identifier for the vendor.
    pub id: Uuid,
    /// Vendor name.
    pub name: String,
    /// Contact email, if known.
    pub contact_email: Option<String>,
    /// Contact phone, if known.
    pub phone: Option<String>,
    /// Mailing address, if known.
    pub address: Option<String>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update.
    pub updated_at: Option<DateTime<Utc>>,
}

/// An on-site inspection appointment.
///
/// Inspections live in the file-backed archive, not in Postgres; see
/// `archive::InspectionArchive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    /// Unique identifier for the inspection.
    pub id: Uuid,
    /// Customer name.
    pub customer_name: String,
    /// Address to inspect.
    pub address: String,
    /// Date the inspection is scheduled for.
    pub scheduled_for: NaiveDate,
    /// Assigned inspector, if any.
    pub inspector: Option<String>,
    /// Lifecycle label, one of [`INSPECTION_STATUSES`].
    pub status: String,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
}

// ============ Derived Models ============

/// Whether a rolled-up customer maps to a registered account or a guest checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    Registered,
    Guest,
}

/// A derived, non-persisted rollup of one customer's booking history.
///
/// Recomputed from scratch on every fetch; has no identity across fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSummary {
    /// Customer display name (from the most recent seed booking).
    pub name: String,
    /// Customer email, when any booking in the bucket carried one.
    pub email: Option<String>,
    /// Customer phone, when any booking in the bucket carried one.
    pub phone: Option<String>,
    /// Number of bookings folded into this summary.
    pub total_bookings: u32,
    /// Sum of booking amounts, missing amounts counted as zero.
    pub total_spent: BigDecimal,
    /// Latest scheduled date among this customer's bookings.
    pub last_booking_date: Option<NaiveDate>,
    /// Registered account vs guest.
    pub registration: RegistrationStatus,
    /// Loyalty points for the matched account, 0 for guests.
    pub loyalty_points: i64,
}

/// Revenue rolled up for one calendar month of completed bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub total: BigDecimal,
    pub completed_bookings: u32,
}

// ============ API Request/Response Models ============

/// Body for the public booking intake endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub user_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub service_name: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: Option<String>,
    pub address: String,
    pub notes: Option<String>,
    pub total_amount: Option<BigDecimal>,
}

/// Response payload for the booking intake endpoint.
#[derive(Debug, Serialize)]
pub struct BookingIntakeResponse {
    /// Whether the booking was accepted.
    pub success: bool,
    /// Message describing the result.
    pub message: String,
    /// The stored booking.
    pub booking: Option<Booking>,
}

/// Body for a targeted booking status update.
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: String,
}

/// Equality filters for the booking list.
#[derive(Debug, Deserialize)]
pub struct BookingQueryParams {
    /// Filter by lifecycle label.
    pub status: Option<String>,
    /// Filter by scheduled date.
    pub date: Option<NaiveDate>,
}

/// Query parameters for single-customer lookup.
#[derive(Debug, Deserialize)]
pub struct CustomerLookupParams {
    /// Look up by email.
    pub email: Option<String>,
    /// Look up by name (case-insensitive).
    pub name: Option<String>,
}

/// One customer's rollup plus the bookings behind it.
#[derive(Debug, Serialize)]
pub struct CustomerDetailResponse {
    pub summary: CustomerSummary,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub duration_minutes: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Partial update for a service offering; absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub duration_minutes: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Partial update for an employee; absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStockItemRequest {
    pub name: String,
    pub quantity: i32,
    pub unit: String,
    #[serde(default)]
    pub reorder_level: i32,
    pub vendor_id: Option<Uuid>,
}

/// Signed quantity adjustment for a stock item.
#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateVendorRequest {
    pub name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Partial update for a vendor; absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateVendorRequest {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInspectionRequest {
    pub customer_name: String,
    pub address: String,
    pub scheduled_for: NaiveDate,
    pub inspector: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInspectionStatusRequest {
    pub status: String,
}

fn default_true() -> bool {
    true
}
