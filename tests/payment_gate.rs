mod common;

use cinema_booking::error::PaymentError;
use cinema_booking::models::{BookingStatus, PaymentStatus};
use common::TestApp;
use futures::future::join_all;

#[tokio::test]
async fn correct_amount_succeeds_exactly_once() {
    let app = TestApp::new();
    let showing = app.showing(2, 2, 100).await;
    let booking = app.book(showing, "Alice", &[(1, 1), (1, 2)]).await;

    let payment = app.payments.process(booking.id, 200).await.unwrap();
    assert_eq!(payment.booking_id, booking.id);
    assert_eq!(payment.status, PaymentStatus::Completed);

    assert!(matches!(
        app.payments.process(booking.id, 200).await,
        Err(PaymentError::DuplicatePayment(id)) if id == booking.id
    ));
}

#[tokio::test]
async fn wrong_amount_is_rejected_and_can_be_retried() {
    let app = TestApp::new();
    let showing = app.showing(2, 2, 100).await;
    let booking = app.book(showing, "Alice", &[(1, 1)]).await;

    assert!(matches!(
        app.payments.process(booking.id, 200).await,
        Err(PaymentError::AmountMismatch { expected: 100, actual: 200 })
    ));
    app.payments.process(booking.id, 100).await.unwrap();
}

#[tokio::test]
async fn paid_booking_is_confirmed_separately() {
    let app = TestApp::new();
    let showing = app.showing(2, 2, 100).await;
    let booking = app.book(showing, "Alice", &[(2, 1)]).await;

    app.payments.process(booking.id, 100).await.unwrap();
    assert_eq!(
        app.bookings.get(booking.id).await.unwrap().booking.status,
        BookingStatus::Pending
    );

    app.bookings.confirm(booking.id).await.unwrap();
    assert!(app.payments.for_booking(booking.id).await.unwrap().is_some());
}

#[tokio::test]
async fn expired_booking_cannot_be_paid() {
    let app = TestApp::new();
    let showing = app.showing(2, 2, 100).await;
    let booking = app.book(showing, "Alice", &[(2, 1)]).await;
    app.bookings.expire(booking.id).await.unwrap();

    assert!(matches!(
        app.payments.process(booking.id, 100).await,
        Err(PaymentError::InvalidState { status: BookingStatus::Expired, .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_payments_record_one() {
    let app = TestApp::new();
    let showing = app.showing(2, 2, 100).await;
    let booking = app.book(showing, "Alice", &[(1, 1), (2, 2)]).await;

    let tasks = (0..8).map(|_| {
        let payments = app.payments.clone();
        tokio::spawn(async move { payments.process(booking.id, 200).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, PaymentError::DuplicatePayment(_))));
}
