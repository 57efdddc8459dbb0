/// Integration tests with a mocked notification gateway
/// Tests gateway dispatch and the intake validators without real external services
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use cleanops_api::intake::{is_valid_email, parse_region, validate_phone};
use cleanops_api::models::{Booking, STATUS_CONFIRMED, STATUS_PENDING};
use cleanops_api::notifier::NotificationGateway;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_booking() -> Booking {
    Booking {
        id: Uuid::new_v4(),
        customer_name: "Jordan Ruiz".to_string(),
        customer_email: Some("jordan@example.com".to_string()),
        customer_phone: Some("+14155552671".to_string()),
        user_id: None,
        service_id: None,
        service_name: "Deep Clean".to_string(),
        scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
        scheduled_time: Some("09:00-11:00".to_string()),
        address: "12 Main St".to_string(),
        notes: None,
        total_amount: Some(BigDecimal::from(180)),
        status: STATUS_PENDING.to_string(),
        created_at: Utc::now(),
        updated_at: None,
    }
}

#[tokio::test]
async fn confirmation_dispatch_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("Authorization", "Bearer test_token"))
        .and(body_partial_json(serde_json::json!({
            "template": "booking_confirmation",
            "service": "Deep Clean",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "delivered": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway =
        NotificationGateway::new(mock_server.uri(), "test_token".to_string()).unwrap();

    let result = gateway.send_booking_confirmation(&sample_booking()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn status_update_carries_the_new_label() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(serde_json::json!({
            "template": "booking_status",
            "status": STATUS_CONFIRMED,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway =
        NotificationGateway::new(mock_server.uri(), "test_token".to_string()).unwrap();

    let mut booking = sample_booking();
    booking.status = STATUS_CONFIRMED.to_string();

    let result = gateway.send_status_update(&booking).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn gateway_error_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let gateway =
        NotificationGateway::new(mock_server.uri(), "test_token".to_string()).unwrap();

    let result = gateway.send_booking_confirmation(&sample_booking()).await;
    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(message.contains("500"), "unexpected error: {}", message);
}

#[tokio::test]
async fn circuit_opens_after_consecutive_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&mock_server)
        .await;

    let gateway = NotificationGateway::new(mock_server.uri(), "test_token".to_string()).unwrap();
    let booking = sample_booking();

    // Breaker trips after 5 consecutive failures
    for _ in 0..5 {
        let result = gateway.send_booking_confirmation(&booking).await;
        assert!(result.is_err());
    }

    let rejected = gateway.send_booking_confirmation(&booking).await;
    assert!(rejected.is_err());
    let message = rejected.unwrap_err().to_string();
    assert!(
        message.contains("circuit"),
        "expected fast rejection, got: {}",
        message
    );
}

#[tokio::test]
async fn concurrent_dispatches_all_complete() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(10)
        .mount(&mock_server)
        .await;

    let gateway = std::sync::Arc::new(
        NotificationGateway::new(mock_server.uri(), "test_token".to_string()).unwrap(),
    );

    let mut handles = vec![];
    for _ in 0..10 {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway.send_booking_confirmation(&sample_booking()).await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}

#[test]
fn test_email_validation_comprehensive() {
    // Valid cases
    assert!(is_valid_email("user@example.com"));
    assert!(is_valid_email("test.user+tag@subdomain.example.co.uk"));
    assert!(is_valid_email("valid_email-2023@company.org"));

    // Invalid cases - fake patterns
    assert!(!is_valid_email("fake999999@example.com"));
    assert!(!is_valid_email("user123456789@example.com"));

    // Invalid cases - malformed
    assert!(!is_valid_email("not_an_email"));
    assert!(!is_valid_email("missing@domain"));
    assert!(!is_valid_email("@example.com"));
    assert!(!is_valid_email("user@"));
    assert!(!is_valid_email(""));
}

#[test]
fn test_phone_validation_comprehensive() {
    let us = parse_region("US").unwrap();

    // Valid US numbers in assorted formats
    let (valid, normalized) = validate_phone("4155552671", us);
    assert!(valid);
    assert_eq!(normalized, "+14155552671");

    let (valid, normalized) = validate_phone("(415) 555-2671", us);
    assert!(valid);
    assert_eq!(normalized, "+14155552671");

    let (valid, normalized) = validate_phone("+1 415 555 2671", us);
    assert!(valid);
    assert_eq!(normalized, "+14155552671");

    // Invalid phones
    let (valid, _) = validate_phone("123", us);
    assert!(!valid);

    let (valid, _) = validate_phone("", us);
    assert!(!valid);

    let (valid, _) = validate_phone("   ", us);
    assert!(!valid);
}

#[test]
fn test_region_parsing() {
    assert!(parse_region("US").is_some());
    assert!(parse_region("us").is_some());
    assert!(parse_region("GB").is_some());
    assert!(parse_region("QQ").is_none());
}
