#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use chrono::{DateTime, TimeZone, Utc};

use leasegate_core::Decision;
use leasegate_enforcement::config::MaxReservationLengthConfig;
use leasegate_enforcement::filters::MaxReservationLengthFilter;
use leasegate_enforcement::EnforcementFilter;

use support::{ctx, ctx_for, lease_at, lease_secs};

const DAY: i64 = 86_400;

#[tokio::test]
async fn within_threshold_allows() {
    let filter = MaxReservationLengthFilter::new(DAY as u64);
    for secs in [1, 60, 3_600, DAY - 1, DAY] {
        let d = filter.check_create(&ctx(), &lease_secs(secs)).await;
        assert_eq!(d, Decision::Allow, "length {secs}");
    }
}

#[tokio::test]
async fn over_threshold_denies() {
    let filter = MaxReservationLengthFilter::new(DAY as u64);
    for secs in [DAY + 1, 2 * DAY, 30 * DAY] {
        let d = filter.check_create(&ctx(), &lease_secs(secs)).await;
        assert!(matches!(d, Decision::Deny { .. }), "length {secs}: {d:?}");
        assert_eq!(d.filter(), Some("MaxReservationLengthFilter"));
    }
}

#[tokio::test]
async fn three_day_lease_against_one_day_limit() {
    let filter = MaxReservationLengthFilter::new(86_400);
    let d = filter.check_create(&ctx(), &lease_secs(3 * DAY)).await;

    let reason = d.reason().unwrap();
    assert!(matches!(d, Decision::Deny { .. }));
    assert!(reason.contains("86400 seconds (1 day)"), "{reason}");
    assert!(reason.contains("259200 seconds (3 days)"), "{reason}");
}

#[tokio::test]
async fn malformed_window_is_error_not_allow() {
    let filter = MaxReservationLengthFilter::new(DAY as u64);
    for secs in [0, -1, -DAY] {
        let d = filter.check_create(&ctx(), &lease_secs(secs)).await;
        assert!(matches!(d, Decision::Error { .. }), "length {secs}: {d:?}");

        let d = filter
            .check_update(&ctx(), &lease_secs(3_600), &lease_secs(secs))
            .await;
        assert!(matches!(d, Decision::Error { .. }), "update length {secs}: {d:?}");
    }
}

#[tokio::test]
async fn malformed_window_is_error_for_exempt_project() {
    let filter = MaxReservationLengthFilter::new(DAY as u64).with_exempt_projects(["ops".to_string()]);
    let ops = ctx_for("ops");

    for secs in [0, -3_600] {
        let d = filter.check_create(&ops, &lease_secs(secs)).await;
        assert!(matches!(d, Decision::Error { .. }), "length {secs}: {d:?}");

        let d = filter.check_update(&ops, &lease_secs(3_600), &lease_secs(secs)).await;
        assert!(matches!(d, Decision::Error { .. }), "update length {secs}: {d:?}");
    }

    // A well-formed window over the limit is still exempt.
    let d = filter.check_create(&ops, &lease_secs(3 * DAY)).await;
    assert_eq!(d, Decision::Allow);
}

#[tokio::test]
async fn update_checks_proposed_lease() {
    let filter = MaxReservationLengthFilter::new(DAY as u64);
    let current = lease_secs(DAY / 2);

    let d = filter.check_update(&ctx(), &current, &lease_secs(DAY)).await;
    assert_eq!(d, Decision::Allow);

    let d = filter.check_update(&ctx(), &current, &lease_secs(DAY + 60)).await;
    assert!(matches!(d, Decision::Deny { .. }));
}

#[tokio::test]
async fn on_end_always_allows() {
    let filter = MaxReservationLengthFilter::new(60);
    let d = filter.on_end(&ctx(), &lease_secs(10 * DAY)).await;
    assert_eq!(d, Decision::Allow);
}

#[tokio::test]
async fn exempt_project_bypasses_limit() {
    let filter = MaxReservationLengthFilter::new(60).with_exempt_projects(["ops".to_string()]);

    let d = filter.check_create(&ctx_for("ops"), &lease_secs(DAY)).await;
    assert_eq!(d, Decision::Allow);

    let d = filter.check_create(&ctx_for("p1"), &lease_secs(DAY)).await;
    assert!(matches!(d, Decision::Deny { .. }));
}

// Current lease: 2030-01-01 .. 2030-01-04 (3 days).
fn inside_window() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 3, 20, 0, 0).unwrap()
}

fn before_window() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap()
}

#[tokio::test]
async fn extension_inside_window_measures_added_time() {
    let filter = MaxReservationLengthFilter::new(3 * DAY as u64)
        .with_extension_window(DAY as u64)
        .with_clock(inside_window);

    let current = lease_secs(3 * DAY);
    // Same start, ends on 2030-01-06: 5 days total, 2 days added.
    let extended = lease_secs(5 * DAY);
    assert_eq!(filter.check_update(&ctx(), &current, &extended).await, Decision::Allow);

    // 4 days added exceeds the limit even inside the window.
    let too_far = lease_secs(7 * DAY);
    let d = filter.check_update(&ctx(), &current, &too_far).await;
    assert!(matches!(d, Decision::Deny { .. }), "{d:?}");
}

#[tokio::test]
async fn extension_before_window_is_denied() {
    let filter = MaxReservationLengthFilter::new(3 * DAY as u64)
        .with_extension_window(DAY as u64)
        .with_clock(before_window);

    let d = filter
        .check_update(&ctx(), &lease_secs(3 * DAY), &lease_secs(5 * DAY))
        .await;
    let reason = d.reason().unwrap();
    assert!(matches!(d, Decision::Deny { .. }));
    assert!(reason.contains("can only be extended within 86400 seconds"), "{reason}");
}

#[tokio::test]
async fn extension_window_does_not_affect_short_updates() {
    let filter = MaxReservationLengthFilter::new(3 * DAY as u64)
        .with_extension_window(DAY as u64)
        .with_clock(before_window);

    // Within the limit: allowed regardless of the window.
    let d = filter
        .check_update(&ctx(), &lease_secs(DAY), &lease_secs(2 * DAY))
        .await;
    assert_eq!(d, Decision::Allow);

    // An unchanged end date is not an extension.
    let d = filter
        .check_update(&ctx(), &lease_at(0, 4 * DAY), &lease_at(0, 4 * DAY))
        .await;
    assert!(matches!(d, Decision::Deny { .. }));
}

#[tokio::test]
async fn built_from_config() {
    let cfg = MaxReservationLengthConfig {
        max_reservation_length: 3_600,
        reservation_extension_window: None,
        exempt_project_ids: vec!["ops".into()],
    };
    let filter = MaxReservationLengthFilter::from_config(&cfg);
    assert_eq!(filter.name(), "MaxReservationLengthFilter");
    assert!(matches!(
        filter.check_create(&ctx(), &lease_secs(7_200)).await,
        Decision::Deny { .. }
    ));
    assert_eq!(
        filter.check_create(&ctx_for("ops"), &lease_secs(7_200)).await,
        Decision::Allow
    );
}
