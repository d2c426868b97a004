mod common;

use chrono::{Duration, Utc};
use cinema_booking::models::{BookingStatus, SeatStatus};
use cinema_booking::services::{ExpirySweeper, SweepReport};
use common::TestApp;

fn sweeper(app: &TestApp) -> ExpirySweeper {
    ExpirySweeper::new(app.bookings.clone(), Duration::minutes(15))
}

#[tokio::test]
async fn fresh_holds_survive_a_sweep() {
    let app = TestApp::new();
    let showing = app.showing(2, 2, 100).await;
    let booking = app.book(showing, "Alice", &[(1, 1)]).await;

    let report = sweeper(&app).sweep(Utc::now()).await.unwrap();
    assert_eq!(report, SweepReport::default());
    assert_eq!(
        app.bookings.get(booking.id).await.unwrap().booking.status,
        BookingStatus::Pending
    );
}

#[tokio::test]
async fn stale_pending_bookings_are_expired_and_seats_freed() {
    let app = TestApp::new();
    let showing = app.showing(2, 2, 100).await;
    let stale = app.book(showing, "Alice", &[(1, 1), (1, 2)]).await;
    let confirmed = app.book(showing, "Bob", &[(2, 2)]).await;
    app.bookings.confirm(confirmed.id).await.unwrap();

    let later = Utc::now() + Duration::minutes(16);
    let report = sweeper(&app).sweep(later).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.expired, 1);
    assert_eq!(report.failed, 0);

    assert_eq!(
        app.bookings.get(stale.id).await.unwrap().booking.status,
        BookingStatus::Expired
    );
    let map = app.seats.seat_map(showing).await.unwrap();
    assert_eq!(map.count(SeatStatus::Free), 3);
    assert_eq!(map.count(SeatStatus::Sold), 1);

    // Повторный проход ничего не находит
    let report = sweeper(&app).sweep(later).await.unwrap();
    assert_eq!(report.scanned, 0);
}

#[tokio::test]
async fn booking_confirmed_before_the_sweep_is_not_expired() {
    let app = TestApp::new();
    let showing = app.showing(2, 2, 100).await;
    let booking = app.book(showing, "Alice", &[(1, 1)]).await;
    app.bookings.confirm(booking.id).await.unwrap();

    let later = Utc::now() + Duration::hours(1);
    assert!(app
        .bookings
        .expire_stale(booking.id, later)
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        app.bookings.get(booking.id).await.unwrap().booking.status,
        BookingStatus::Confirmed
    );
}
