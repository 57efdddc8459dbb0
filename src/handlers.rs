use crate::archive::InspectionArchive;
use crate::config::Config;
use crate::errors::AppError;
use crate::intake;
use crate::models::*;
use crate::notifier::NotificationGateway;
use crate::revenue;
use crate::rollup;
use crate::storage::CustomerDataStore;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Client for the notification gateway (optional).
    pub notifier: Option<Arc<NotificationGateway>>,
    /// Duplicate-submission cache for the public booking form.
    pub recent_booking_cache: Cache<String, i64>,
    /// Short-TTL cache of the customer rollup, invalidated on booking writes.
    pub summary_cache: Cache<&'static str, Vec<CustomerSummary>>,
    /// Inspection archive handle.
    pub archive: Arc<dyn InspectionArchive>,
}

/// Health check endpoint.
///
/// Returns the service status and version; bypasses rate limiting.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "cleanops-api",
            "version": "0.1.0"
        })),
    )
}

/// Guards admin endpoints with the configured bearer token.
///
/// When `ADMIN_TOKEN` is unset the check is skipped (warned at startup).
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(ref expected) = state.config.admin_token else {
        return Ok(());
    };

    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if !constant_time_compare(token, expected) {
        tracing::warn!("Invalid admin token received");
        return Err(AppError::Unauthorized("Invalid admin token".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison (basic implementation)
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

// ============ Bookings ============

/// POST /api/v1/bookings
///
/// Public booking intake. Validates the submission, suppresses duplicates,
/// stores the booking with status `pending`, and dispatches a confirmation
/// off the request path.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingIntakeResponse>), AppError> {
    tracing::info!("POST /bookings - {}", req.customer_name);

    let booking = intake::intake_booking(state, req).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingIntakeResponse {
            success: true,
            message: "Booking received".to_string(),
            booking: Some(booking),
        }),
    ))
}

/// GET /api/v1/bookings
///
/// Lists bookings, optionally filtered by status and/or scheduled date,
/// newest first. No pagination.
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<BookingQueryParams>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("GET /bookings - params: {:?}", params);

    if let Some(ref status) = params.status {
        if !is_valid_booking_status(status) {
            return Err(AppError::BadRequest(format!(
                "Unknown booking status: {}",
                status
            )));
        }
    }

    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT * FROM bookings
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::date IS NULL OR scheduled_date = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(&params.status)
    .bind(params.date)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(bookings))
}

/// GET /api/v1/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("GET /bookings/{}", id);

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))?;

    Ok(Json(booking))
}

/// PATCH /api/v1/bookings/:id/status
///
/// Targeted status update, the only mutation bookings receive after insert.
/// Dispatches a status notification when a gateway is configured.
pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("PATCH /bookings/{}/status -> {}", id, req.status);

    if !is_valid_booking_status(&req.status) {
        return Err(AppError::BadRequest(format!(
            "Unknown booking status: {}",
            req.status
        )));
    }

    let booking = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.status)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))?;

    // Status changes feed the rollup (spend, revenue)
    state.summary_cache.invalidate("all").await;

    intake::spawn_status_dispatch(&state, booking.clone());

    Ok(Json(booking))
}

// ============ Customers (rollup) ============

/// GET /api/v1/customers
///
/// The customer rollup: bookings, profiles, and loyalty balances fetched as a
/// unit and folded into one summary per distinct customer. Served from a
/// short-TTL cache that booking writes invalidate; a failed fetch aborts the
/// request and publishes nothing partial.
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CustomerSummary>>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("GET /customers");

    if let Some(cached) = state.summary_cache.get("all").await {
        tracing::debug!("Customer rollup cache HIT ({} summaries)", cached.len());
        return Ok(Json(cached));
    }

    let store = CustomerDataStore::new(state.db.clone());
    let (bookings, profiles, points) = store.fetch_rollup_inputs().await?;

    let mut summaries = rollup::summarize_customers(&bookings, &profiles, &points);
    // Stable response order; the fold itself is unordered
    summaries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    state.summary_cache.insert("all", summaries.clone()).await;

    tracing::info!(
        "Customer rollup computed: {} bookings -> {} summaries",
        bookings.len(),
        summaries.len()
    );

    Ok(Json(summaries))
}

/// GET /api/v1/customers/lookup?email=|name=
///
/// One customer's summary plus the bookings behind it. Requires at least one
/// identifier.
pub async fn lookup_customer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CustomerLookupParams>,
) -> Result<Json<CustomerDetailResponse>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("GET /customers/lookup - params: {:?}", params);

    if params.email.as_deref().map_or(true, |s| s.trim().is_empty())
        && params.name.as_deref().map_or(true, |s| s.trim().is_empty())
    {
        return Err(AppError::BadRequest(
            "At least one identifier required (email or name)".to_string(),
        ));
    }

    let store = CustomerDataStore::new(state.db.clone());
    let (bookings, profiles, points) = store.fetch_rollup_inputs().await?;

    let summaries = rollup::summarize_customers(&bookings, &profiles, &points);
    let summary =
        rollup::find_summary(summaries, params.email.as_deref(), params.name.as_deref())
            .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

    let customer_bookings: Vec<Booking> = bookings
        .into_iter()
        .filter(|b| rollup::booking_matches(b, params.email.as_deref(), params.name.as_deref()))
        .collect();

    Ok(Json(CustomerDetailResponse {
        summary,
        bookings: customer_bookings,
    }))
}

// ============ Services ============

/// GET /api/v1/services
///
/// Public: the booking site renders the catalog from this.
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ServiceOffering>>, AppError> {
    let services =
        sqlx::query_as::<_, ServiceOffering>("SELECT * FROM services ORDER BY name ASC")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(services))
}

/// POST /api/v1/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceOffering>), AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("POST /services - {}", req.name);

    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if req.duration_minutes <= 0 {
        return Err(AppError::BadRequest(
            "duration_minutes must be positive".to_string(),
        ));
    }

    let service = sqlx::query_as::<_, ServiceOffering>(
        r#"
        INSERT INTO services (id, name, description, price, duration_minutes, active, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(&req.price)
    .bind(req.duration_minutes)
    .bind(req.active)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(service)))
}

/// PUT /api/v1/services/:id — partial update, absent fields unchanged.
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<Json<ServiceOffering>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("PUT /services/{}", id);

    let service = sqlx::query_as::<_, ServiceOffering>(
        r#"
        UPDATE services
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            price = COALESCE($4, price),
            duration_minutes = COALESCE($5, duration_minutes),
            active = COALESCE($6, active),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.price)
    .bind(req.duration_minutes)
    .bind(req.active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Service {} not found", id)))?;

    Ok(Json(service))
}

// ============ Employees ============

/// GET /api/v1/employees
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Employee>>, AppError> {
    require_admin(&state, &headers)?;

    let employees =
        sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY full_name ASC")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(employees))
}

/// POST /api/v1/employees
pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("POST /employees - {}", req.full_name);

    if req.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("full_name is required".to_string()));
    }
    if !intake::is_valid_email(req.email.trim()) {
        return Err(AppError::BadRequest(format!(
            "Invalid email address: {}",
            req.email
        )));
    }

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        INSERT INTO employees (id, full_name, email, phone, role, active, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.full_name.trim())
    .bind(req.email.trim())
    .bind(&req.phone)
    .bind(&req.role)
    .bind(req.active)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(employee)))
}

/// PUT /api/v1/employees/:id — partial update, absent fields unchanged.
pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> Result<Json<Employee>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("PUT /employees/{}", id);

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        UPDATE employees
        SET full_name = COALESCE($2, full_name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            role = COALESCE($5, role),
            active = COALESCE($6, active),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.full_name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.role)
    .bind(req.active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;

    Ok(Json(employee))
}

// ============ Stocks ============

/// GET /api/v1/stocks
pub async fn list_stocks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<StockItem>>, AppError> {
    require_admin(&state, &headers)?;

    let items = sqlx::query_as::<_, StockItem>("SELECT * FROM stock_items ORDER BY name ASC")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(items))
}

/// POST /api/v1/stocks
pub async fn create_stock_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateStockItemRequest>,
) -> Result<(StatusCode, Json<StockItem>), AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("POST /stocks - {}", req.name);

    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if req.quantity < 0 {
        return Err(AppError::BadRequest(
            "quantity cannot be negative".to_string(),
        ));
    }

    let item = sqlx::query_as::<_, StockItem>(
        r#"
        INSERT INTO stock_items (id, name, quantity, unit, reorder_level, vendor_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(req.quantity)
    .bind(&req.unit)
    .bind(req.reorder_level)
    .bind(req.vendor_id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// PATCH /api/v1/stocks/:id/quantity
///
/// Signed delta adjustment, floored at zero.
pub async fn adjust_stock_quantity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<AdjustStockRequest>,
) -> Result<Json<StockItem>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("PATCH /stocks/{}/quantity - delta {}", id, req.delta);

    let item = sqlx::query_as::<_, StockItem>(
        r#"
        UPDATE stock_items
        SET quantity = GREATEST(quantity + $2, 0), updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.delta)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Stock item {} not found", id)))?;

    if item.quantity <= item.reorder_level {
        tracing::warn!(
            "Stock item '{}' at or below reorder level ({} <= {})",
            item.name,
            item.quantity,
            item.reorder_level
        );
    }

    Ok(Json(item))
}

// ============ Vendors ============

/// GET /api/v1/vendors
pub async fn list_vendors(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Vendor>>, AppError> {
    require_admin(&state, &headers)?;

    let vendors = sqlx::query_as::<_, Vendor>("SELECT * FROM vendors ORDER BY name ASC")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(vendors))
}

/// POST /api/v1/vendors
pub async fn create_vendor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateVendorRequest>,
) -> Result<(StatusCode, Json<Vendor>), AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("POST /vendors - {}", req.name);

    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }

    let vendor = sqlx::query_as::<_, Vendor>(
        r#"
        INSERT INTO vendors (id, name, contact_email, phone, address, created_at)
        VALUES ($1, $2, $3, $4, $5, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(&req.contact_email)
    .bind(&req.phone)
    .bind(&req.address)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(vendor)))
}

/// PUT /api/v1/vendors/:id — partial update, absent fields unchanged.
pub async fn update_vendor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateVendorRequest>,
) -> Result<Json<Vendor>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("PUT /vendors/{}", id);

    let vendor = sqlx::query_as::<_, Vendor>(
        r#"
        UPDATE vendors
        SET name = COALESCE($2, name),
            contact_email = COALESCE($3, contact_email),
            phone = COALESCE($4, phone),
            address = COALESCE($5, address),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.contact_email)
    .bind(&req.phone)
    .bind(&req.address)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Vendor {} not found", id)))?;

    Ok(Json(vendor))
}

// ============ Inspections (archive-backed) ============

/// GET /api/v1/inspections
pub async fn list_inspections(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Inspection>>, AppError> {
    require_admin(&state, &headers)?;

    let inspections = state.archive.load_all().await?;
    Ok(Json(inspections))
}

/// POST /api/v1/inspections
pub async fn create_inspection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateInspectionRequest>,
) -> Result<(StatusCode, Json<Inspection>), AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("POST /inspections - {}", req.customer_name);

    if req.customer_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "customer_name is required".to_string(),
        ));
    }
    if req.address.trim().is_empty() {
        return Err(AppError::BadRequest("address is required".to_string()));
    }

    let inspection = state
        .archive
        .append(Inspection {
            id: Uuid::new_v4(),
            customer_name: req.customer_name.trim().to_string(),
            address: req.address.trim().to_string(),
            scheduled_for: req.scheduled_for,
            inspector: req.inspector,
            status: INSPECTION_SCHEDULED.to_string(),
            notes: req.notes,
            created_at: chrono::Utc::now(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(inspection)))
}

/// PATCH /api/v1/inspections/:id/status
pub async fn update_inspection_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInspectionStatusRequest>,
) -> Result<Json<Inspection>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("PATCH /inspections/{}/status -> {}", id, req.status);

    if !is_valid_inspection_status(&req.status) {
        return Err(AppError::BadRequest(format!(
            "Unknown inspection status: {}",
            req.status
        )));
    }

    let inspection = state.archive.update_status(id, &req.status).await?;
    Ok(Json(inspection))
}

// ============ Revenue ============

/// GET /api/v1/revenue/monthly
///
/// Monthly totals over completed bookings, newest month first.
pub async fn monthly_revenue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<MonthlyRevenue>>, AppError> {
    require_admin(&state, &headers)?;
    tracing::info!("GET /revenue/monthly");

    let store = CustomerDataStore::new(state.db.clone());
    let completed = store.fetch_completed_bookings().await?;

    Ok(Json(revenue::monthly_revenue(&completed)))
}
