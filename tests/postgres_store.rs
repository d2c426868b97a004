//! Те же сценарии поверх `PgStore`.
//!
//! Нужна пустая или тестовая база в `DATABASE_URL`; миграции применяются сами.
//! Каждый тест регистрирует свой сеанс, поэтому тесты не мешают друг другу.
//! Запуск: `cargo test --test postgres_store -- --ignored`.

mod common;

use std::sync::Arc;

use cinema_booking::config::{StorageBackend, StorageConfig};
use cinema_booking::database::Database;
use cinema_booking::error::{BookingError, PaymentError, StoreError};
use cinema_booking::models::{Payment, SeatPosition, SeatStatus};
use common::{request, TestApp};
use fake::faker::name::en::Name;
use fake::Fake;
use futures::future::join_all;

async fn pg_app() -> (TestApp, Database) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let config = StorageConfig {
        backend: StorageBackend::Postgres,
        database_url: Some(url),
        pool_size: 40,
    };
    let db = Database::connect(&config).await.expect("connect to Postgres");
    db.run_migrations().await.expect("run migrations");
    (TestApp::with_store(Arc::new(db.store())), db)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs DATABASE_URL"]
async fn two_by_two_scenario_on_postgres() {
    let (app, _db) = pg_app().await;
    let showing = app.showing(2, 2, 100).await;

    let alice = app.book(showing, "Alice", &[(1, 1), (1, 2)]).await;
    assert_eq!(alice.total_price, 200);

    let err = app
        .bookings
        .create(request(showing, "Bob", &[(1, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatsUnavailable(p) if p == SeatPosition::new(1, 1)));

    app.bookings.confirm(alice.id).await.unwrap();
    let map = app.seats.seat_map(showing).await.unwrap();
    assert_eq!(map.count(SeatStatus::Sold), 2);

    app.bookings.cancel(alice.id).await.unwrap();
    let map = app.seats.seat_map(showing).await.unwrap();
    assert_eq!(map.count(SeatStatus::Free), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs DATABASE_URL"]
async fn one_seat_many_requesters_exactly_one_wins_on_postgres() {
    let (app, _db) = pg_app().await;
    let showing = app.showing(3, 3, 100).await;

    let tasks = (0..24).map(|_| {
        let bookings = app.bookings.clone();
        let name: String = Name().fake();
        // пересекающиеся наборы, перечисленные в разном порядке
        tokio::spawn(async move {
            bookings
                .create(request(showing, &name, &[(2, 3), (2, 2), (1, 1)]))
                .await
        })
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
        .all(|e| matches!(e, BookingError::SeatsUnavailable(p) if *p == SeatPosition::new(1, 1))));

    let map = app.seats.seat_map(showing).await.unwrap();
    assert_eq!(map.count(SeatStatus::Reserved), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs DATABASE_URL"]
async fn racing_payments_record_one_on_postgres() {
    let (app, _db) = pg_app().await;
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

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn unique_payment_constraint_maps_to_duplicate_payment() {
    let (app, _db) = pg_app().await;
    let showing = app.showing(1, 1, 100).await;
    let booking = app.book(showing, "Alice", &[(1, 1)]).await;
    app.payments.process(booking.id, 100).await.unwrap();

    // в обход проверки сервиса: срабатывает только ограничение таблицы
    let mut tx = app.store.begin().await.unwrap();
    let err = tx
        .insert_payment(&Payment::completed(booking.id, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicatePayment(id) if id == booking.id));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn seat_status_and_owner_must_agree() {
    let (app, db) = pg_app().await;
    let showing = app.showing(1, 1, 100).await;

    let err = sqlx::query("UPDATE seats SET status = 'reserved' WHERE showing_id = $1")
        .bind(showing)
        .execute(&db.pool)
        .await
        .unwrap_err();
    assert!(matches!(err, sqlx::Error::Database(ref e) if e.is_check_violation()));

    let seat = app.seats.seat(showing, SeatPosition::new(1, 1)).await.unwrap().unwrap();
    assert!(seat.is_free());
}
