/// Unit tests for the customer rollup
/// Tests key derivation, merge behavior, and profile/points matching
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use cleanops_api::models::{
    Booking, LoyaltyPoints, RegistrationStatus, UserProfile, STATUS_COMPLETED, STATUS_PENDING,
};
use cleanops_api::rollup::{
    booking_matches, find_summary, summarize_customers, CustomerKey,
};
use uuid::Uuid;

fn booking(
    name: &str,
    email: Option<&str>,
    amount: Option<i64>,
    date: &str,
) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        customer_name: name.to_string(),
        customer_email: email.map(str::to_string),
        customer_phone: None,
        user_id: None,
        service_id: None,
        service_name: "Standard Clean".to_string(),
        scheduled_date: date.parse::<NaiveDate>().unwrap(),
        scheduled_time: Some("09:00-11:00".to_string()),
        address: "12 Main St".to_string(),
        notes: None,
        total_amount: amount.map(BigDecimal::from),
        status: STATUS_PENDING.to_string(),
        created_at: Utc::now(),
        updated_at: None,
    }
}

fn profile(id: Uuid, full_name: &str, email: &str) -> UserProfile {
    UserProfile {
        id,
        full_name: full_name.to_string(),
        email: email.to_string(),
        phone: None,
        created_at: Utc::now(),
    }
}

#[test]
fn merges_repeat_customer_by_email() {
    // The worked example: two bookings for a@x.com aggregate to one summary
    let bookings = vec![
        booking("Ana", Some("a@x.com"), Some(100), "2024-01-01"),
        booking("Ana", Some("a@x.com"), Some(50), "2024-02-01"),
    ];

    let summaries = summarize_customers(&bookings, &[], &[]);
    assert_eq!(summaries.len(), 1);

    let s = &summaries[0];
    assert_eq!(s.total_bookings, 2);
    assert_eq!(s.total_spent, BigDecimal::from(150));
    assert_eq!(
        s.last_booking_date,
        Some("2024-02-01".parse::<NaiveDate>().unwrap())
    );
    assert_eq!(s.registration, RegistrationStatus::Guest);
}

#[test]
fn distinct_emails_stay_distinct() {
    let bookings = vec![
        booking("Ana", Some("a@x.com"), Some(100), "2024-01-01"),
        booking("Ben", Some("b@x.com"), Some(50), "2024-01-02"),
        booking("Cyn", Some("c@x.com"), None, "2024-01-03"),
    ];

    let summaries = summarize_customers(&bookings, &[], &[]);
    assert_eq!(summaries.len(), 3);
}

#[test]
fn email_comparison_is_case_insensitive() {
    let bookings = vec![
        booking("Ana", Some("A@X.com"), Some(10), "2024-01-01"),
        booking("Ana", Some("a@x.com"), Some(20), "2024-01-05"),
    ];

    let summaries = summarize_customers(&bookings, &[], &[]);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_spent, BigDecimal::from(30));
}

#[test]
fn falls_back_to_name_without_email() {
    let bookings = vec![
        booking("Dana Fox", None, Some(40), "2024-03-01"),
        booking("dana fox", None, Some(60), "2024-03-08"),
    ];

    let summaries = summarize_customers(&bookings, &[], &[]);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_bookings, 2);
    assert_eq!(summaries[0].total_spent, BigDecimal::from(100));
}

#[test]
fn blank_email_counts_as_absent() {
    let bookings = vec![
        booking("Dana Fox", Some("  "), Some(40), "2024-03-01"),
        booking("Dana Fox", None, Some(60), "2024-03-08"),
    ];

    let summaries = summarize_customers(&bookings, &[], &[]);
    assert_eq!(summaries.len(), 1);
}

#[test]
fn nameless_emailless_bookings_are_one_customer_each() {
    let bookings = vec![
        booking("", None, Some(10), "2024-01-01"),
        booking("  ", None, Some(20), "2024-01-02"),
    ];

    let summaries = summarize_customers(&bookings, &[], &[]);
    assert_eq!(summaries.len(), 2);
}

#[test]
fn key_derivation_prefers_email_then_name_then_id() {
    let with_email = booking("Ana", Some("A@x.com"), None, "2024-01-01");
    assert_eq!(
        CustomerKey::derive(&with_email),
        CustomerKey::Email("a@x.com".to_string())
    );

    let with_name = booking("Ana Lee", None, None, "2024-01-01");
    assert_eq!(
        CustomerKey::derive(&with_name),
        CustomerKey::Name("ana lee".to_string())
    );

    let bare = booking("", None, None, "2024-01-01");
    assert_eq!(CustomerKey::derive(&bare), CustomerKey::Booking(bare.id));
}

#[test]
fn missing_amounts_count_as_zero() {
    let bookings = vec![
        booking("Ana", Some("a@x.com"), None, "2024-01-01"),
        booking("Ana", Some("a@x.com"), Some(75), "2024-01-09"),
    ];

    let summaries = summarize_customers(&bookings, &[], &[]);
    assert_eq!(summaries[0].total_spent, BigDecimal::from(75));
}

#[test]
fn earlier_booking_does_not_regress_last_date() {
    // Out-of-order input: the later date must win regardless of position
    let bookings = vec![
        booking("Ana", Some("a@x.com"), Some(10), "2024-05-01"),
        booking("Ana", Some("a@x.com"), Some(10), "2024-02-01"),
    ];

    let summaries = summarize_customers(&bookings, &[], &[]);
    assert_eq!(
        summaries[0].last_booking_date,
        Some("2024-05-01".parse::<NaiveDate>().unwrap())
    );
}

#[test]
fn registered_when_profile_matches_by_id() {
    let user_id = Uuid::new_v4();
    let mut b = booking("Ana", Some("a@x.com"), Some(10), "2024-01-01");
    b.user_id = Some(user_id);

    let profiles = vec![profile(user_id, "Ana Lee", "ana@registered.com")];
    let summaries = summarize_customers(&[b], &profiles, &[]);

    assert_eq!(summaries[0].registration, RegistrationStatus::Registered);
}

#[test]
fn registered_when_profile_matches_by_name_case_insensitive() {
    let bookings = vec![booking("ana lee", Some("a@x.com"), Some(10), "2024-01-01")];
    let profiles = vec![profile(Uuid::new_v4(), "Ana Lee", "ana@registered.com")];

    let summaries = summarize_customers(&bookings, &profiles, &[]);
    assert_eq!(summaries[0].registration, RegistrationStatus::Registered);
}

#[test]
fn guest_when_no_profile_matches() {
    let bookings = vec![booking("Ana", Some("a@x.com"), Some(10), "2024-01-01")];
    let profiles = vec![profile(Uuid::new_v4(), "Someone Else", "other@x.com")];

    let summaries = summarize_customers(&bookings, &profiles, &[]);
    assert_eq!(summaries[0].registration, RegistrationStatus::Guest);
    assert_eq!(summaries[0].loyalty_points, 0);
}

#[test]
fn loyalty_points_attach_by_matched_profile() {
    let user_id = Uuid::new_v4();
    let mut b = booking("Ana", Some("a@x.com"), Some(10), "2024-01-01");
    b.user_id = Some(user_id);

    let profiles = vec![profile(user_id, "Ana Lee", "ana@registered.com")];
    let points = vec![LoyaltyPoints {
        user_id,
        points: 240,
        updated_at: None,
    }];

    let summaries = summarize_customers(&[b], &profiles, &points);
    assert_eq!(summaries[0].loyalty_points, 240);
}

#[test]
fn points_default_to_zero_without_balance_row() {
    let user_id = Uuid::new_v4();
    let mut b = booking("Ana", Some("a@x.com"), Some(10), "2024-01-01");
    b.user_id = Some(user_id);

    let profiles = vec![profile(user_id, "Ana Lee", "ana@registered.com")];
    let summaries = summarize_customers(&[b], &profiles, &[]);

    assert_eq!(summaries[0].registration, RegistrationStatus::Registered);
    assert_eq!(summaries[0].loyalty_points, 0);
}

#[test]
fn later_matching_booking_upgrades_guest_bucket() {
    let user_id = Uuid::new_v4();
    let first = booking("Ana", Some("a@x.com"), Some(10), "2024-01-01");
    let mut second = booking("Ana", Some("a@x.com"), Some(20), "2024-01-05");
    second.user_id = Some(user_id);

    let profiles = vec![profile(user_id, "Ana Lee", "ana@registered.com")];
    let points = vec![LoyaltyPoints {
        user_id,
        points: 55,
        updated_at: None,
    }];

    let summaries = summarize_customers(&[first, second], &profiles, &points);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].registration, RegistrationStatus::Registered);
    assert_eq!(summaries[0].loyalty_points, 55);
}

#[test]
fn empty_input_yields_empty_output() {
    let summaries = summarize_customers(&[], &[], &[]);
    assert!(summaries.is_empty());
}

#[test]
fn status_labels_do_not_affect_bucketing() {
    let mut completed = booking("Ana", Some("a@x.com"), Some(100), "2024-01-01");
    completed.status = STATUS_COMPLETED.to_string();
    let pending = booking("Ana", Some("a@x.com"), Some(50), "2024-02-01");

    let summaries = summarize_customers(&[completed, pending], &[], &[]);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_bookings, 2);
}

#[test]
fn find_summary_by_email_and_name() {
    let bookings = vec![
        booking("Ana", Some("a@x.com"), Some(100), "2024-01-01"),
        booking("Ben Ray", None, Some(50), "2024-01-02"),
    ];
    let summaries = summarize_customers(&bookings, &[], &[]);

    let by_email = find_summary(summaries.clone(), Some("A@X.COM"), None);
    assert!(by_email.is_some());
    assert_eq!(by_email.unwrap().total_spent, BigDecimal::from(100));

    let by_name = find_summary(summaries.clone(), None, Some("ben ray"));
    assert!(by_name.is_some());

    assert!(find_summary(summaries, Some("missing@x.com"), None).is_none());
}

#[test]
fn booking_matches_filters_one_customer() {
    let a = booking("Ana", Some("a@x.com"), Some(100), "2024-01-01");
    let b = booking("Ben Ray", None, Some(50), "2024-01-02");

    assert!(booking_matches(&a, Some("a@x.com"), None));
    assert!(!booking_matches(&b, Some("a@x.com"), None));
    assert!(booking_matches(&b, None, Some("Ben Ray")));
    assert!(!booking_matches(&a, None, None));
}
