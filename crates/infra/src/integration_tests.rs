//! Service-level tests against the in-memory store.
//!
//! Covers the full pipeline: status change → reservation → scans → phase
//! completion → history → lifecycle bus → notification worker.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::mpsc;

    use rentflow_auth::{Actor, AuthzError};
    use rentflow_core::{CompanyId, DateRange, OrderId, ScanEventId, UserId};
    use rentflow_events::{EventBus, InMemoryEventBus, Subscription};
    use rentflow_fulfillment::{
        Asset, AssetBooking, AssetStatus, Condition, NewScan, NotificationType, Order, OrderItem,
        OrderStatus, ScanEvent, ScanRejection, ScanType, TrackingMethod, TransitionDenial,
    };

    use crate::error::{ErrorKind, FulfillmentError};
    use crate::lifecycle::LifecycleEnvelope;
    use crate::notification::{NotificationDispatcher, NotificationError, NotificationWorker, RetryPolicy};
    use crate::service::FulfillmentService;
    use crate::store::{FulfillmentStore, InMemoryFulfillmentStore, StoreTx};

    type Bus = Arc<InMemoryEventBus<LifecycleEnvelope>>;
    type Service = FulfillmentService<InMemoryFulfillmentStore, Bus>;

    fn setup() -> (Service, InMemoryFulfillmentStore, Bus) {
        let store = InMemoryFulfillmentStore::new();
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let service = FulfillmentService::new(store.clone(), bus.clone());
        (service, store, bus)
    }

    fn event_window() -> DateRange {
        let start = Utc::now() + chrono::Duration::days(14);
        DateRange::new(start, start + chrono::Duration::days(2)).unwrap()
    }

    async fn seed_order(
        store: &InMemoryFulfillmentStore,
        company_id: CompanyId,
        status: OrderStatus,
        lines: &[(&Asset, u32)],
    ) -> Order {
        let order = Order::new(
            format!("ORD-{}", OrderId::new()),
            company_id,
            status,
            event_window(),
            "Expo Hall",
            Utc::now(),
        );
        let items = lines
            .iter()
            .map(|(asset, qty)| OrderItem::new(order.id, asset.id, *qty).unwrap())
            .collect();
        store.insert_order(order.clone(), items).await;
        order
    }

    async fn seed_asset(store: &InMemoryFulfillmentStore, qr: &str, total: u32, tracking: TrackingMethod) -> Asset {
        let asset = Asset::new(format!("Asset {qr}"), qr, total, tracking);
        store.insert_asset(asset.clone()).await;
        asset
    }

    async fn seed_booking(store: &InMemoryFulfillmentStore, order: &Order, asset: &Asset, qty: u32) {
        let mut tx = store.begin().await.unwrap();
        tx.insert_bookings(&[AssetBooking::new(order.id, asset.id, qty, Utc::now())])
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    async fn seed_scan(store: &InMemoryFulfillmentStore, order: &Order, asset: &Asset, scan_type: ScanType, qty: u32) {
        let mut tx = store.begin().await.unwrap();
        tx.append_scan(&ScanEvent {
            id: ScanEventId::new(),
            order_id: order.id,
            asset_id: asset.id,
            scan_type,
            quantity: qty,
            condition: Condition::Green,
            notes: None,
            photos: Vec::new(),
            actor_id: UserId::new(),
            scanned_at: Utc::now(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    fn scan(qr: &str, scan_type: ScanType, quantity: Option<u32>) -> NewScan {
        NewScan {
            qr_code: qr.to_string(),
            scan_type,
            quantity,
            condition: Condition::Green,
            notes: None,
            photos: Vec::new(),
        }
    }

    fn staff() -> Actor {
        Actor::fulfillment(UserId::new())
    }

    #[tokio::test]
    async fn individual_units_scan_to_completion_and_reject_the_extra_unit() {
        let (service, store, _bus) = setup();
        let chairs = seed_asset(&store, "QR-CHAIR", 10, TrackingMethod::Individual).await;
        let order = seed_order(&store, CompanyId::new(), OrderStatus::InPreparation, &[(&chairs, 3)]).await;
        let actor = staff();

        let mut progress = None;
        for _ in 0..3 {
            progress = Some(
                service
                    .record_scan(order.id, scan("QR-CHAIR", ScanType::Outbound, None), &actor)
                    .await
                    .unwrap(),
            );
        }
        let progress = progress.unwrap();
        assert_eq!(progress.total_scanned, 3);
        assert_eq!(progress.total_required, 3);
        assert_eq!(progress.percent_complete, 100);
        assert!(progress.can_complete);

        let err = service
            .record_scan(order.id, scan("QR-CHAIR", ScanType::Outbound, None), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Scan(ScanRejection::OverScan { already: 3, .. })));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn availability_subtracts_bookings_and_units_out() {
        let (service, store, _bus) = setup();
        let tables = seed_asset(&store, "QR-TABLE", 5, TrackingMethod::Batch).await;
        let booked = seed_order(&store, CompanyId::new(), OrderStatus::Confirmed, &[(&tables, 3)]).await;
        seed_booking(&store, &booked, &tables, 3).await;
        let delivered = seed_order(&store, CompanyId::new(), OrderStatus::Delivered, &[(&tables, 1)]).await;
        seed_scan(&store, &delivered, &tables, ScanType::Outbound, 1).await;

        let availability = service.get_availability(tables.id, None, &staff()).await.unwrap();

        assert_eq!(availability.booked, 3);
        assert_eq!(availability.out, 1);
        assert_eq!(availability.available, 1);
        assert_eq!(availability.status, AssetStatus::Out);
    }

    #[tokio::test]
    async fn windowed_availability_ignores_distant_bookings() {
        let (service, store, _bus) = setup();
        let tables = seed_asset(&store, "QR-TABLE", 5, TrackingMethod::Batch).await;
        let order = seed_order(&store, CompanyId::new(), OrderStatus::Confirmed, &[(&tables, 5)]).await;
        seed_booking(&store, &order, &tables, 5).await;

        let far = Utc::now() + chrono::Duration::days(90);
        let window = DateRange::new(far, far + chrono::Duration::days(1)).unwrap();
        let availability = service.get_availability(tables.id, Some(window), &staff()).await.unwrap();
        assert_eq!(availability.available, 5);

        let overall = service.get_availability(tables.id, None, &staff()).await.unwrap();
        assert_eq!(overall.available, 0);
    }

    #[tokio::test]
    async fn client_cannot_move_an_order_into_preparation() {
        let (service, store, _bus) = setup();
        let company = CompanyId::new();
        let order = seed_order(&store, company, OrderStatus::Confirmed, &[]).await;
        let client = Actor::client(UserId::new(), company);

        let err = service
            .progress_order_status(order.id, OrderStatus::InPreparation, None, &client)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FulfillmentError::Transition(TransitionDenial::RoleNotPermitted { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(service.get_order_status_history(order.id, &client).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn declining_a_quote_never_books_anything() {
        let (service, store, _bus) = setup();
        let company = CompanyId::new();
        let stools = seed_asset(&store, "QR-STOOL", 10, TrackingMethod::Batch).await;
        let order = seed_order(&store, company, OrderStatus::Quoted, &[(&stools, 4)]).await;
        let client = Actor::client(UserId::new(), company);
        assert!(store.all_bookings().await.is_empty());

        let declined = service
            .progress_order_status(order.id, OrderStatus::Declined, Some("over budget".into()), &client)
            .await
            .unwrap();

        assert_eq!(declined.status, OrderStatus::Declined);
        assert!(store.all_bookings().await.is_empty());
        let history = service.get_order_status_history(order.id, &client).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].note.as_deref(), Some("over budget"));
    }

    #[tokio::test]
    async fn confirming_books_every_item_and_cancelling_releases() {
        let (service, store, _bus) = setup();
        let company = CompanyId::new();
        let stools = seed_asset(&store, "QR-STOOL", 10, TrackingMethod::Batch).await;
        let lamps = seed_asset(&store, "QR-LAMP", 2, TrackingMethod::Individual).await;
        let order = seed_order(&store, company, OrderStatus::Quoted, &[(&stools, 4), (&lamps, 2)]).await;

        service
            .progress_order_status(order.id, OrderStatus::Confirmed, None, &Actor::client(UserId::new(), company))
            .await
            .unwrap();
        assert_eq!(store.all_bookings().await.len(), 2);

        let mut tx = store.begin().await.unwrap();
        let held = tx.bookings_for_order(order.id).await.unwrap();
        tx.commit().await.unwrap();
        let mut quantities: Vec<_> = held.iter().map(|b| (b.asset_id, b.quantity)).collect();
        quantities.sort();
        let mut expected = vec![(stools.id, 4), (lamps.id, 2)];
        expected.sort();
        assert_eq!(quantities, expected);

        service
            .progress_order_status(order.id, OrderStatus::Cancelled, None, &Actor::admin(UserId::new()))
            .await
            .unwrap();
        assert!(store.all_bookings().await.is_empty());

        let mut tx = store.begin().await.unwrap();
        assert!(tx.bookings_for_order(order.id).await.unwrap().is_empty());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn orders_with_goods_scanned_out_cannot_be_cancelled() {
        let (service, store, _bus) = setup();
        let company = CompanyId::new();
        let tents = seed_asset(&store, "QR-TENT", 5, TrackingMethod::Batch).await;
        let order = seed_order(&store, company, OrderStatus::Quoted, &[(&tents, 2)]).await;
        let admin = Actor::admin(UserId::new());
        let actor = staff();

        service
            .progress_order_status(order.id, OrderStatus::Confirmed, None, &Actor::client(UserId::new(), company))
            .await
            .unwrap();
        service
            .progress_order_status(order.id, OrderStatus::InPreparation, None, &actor)
            .await
            .unwrap();
        service
            .record_scan(order.id, scan("QR-TENT", ScanType::Outbound, Some(2)), &actor)
            .await
            .unwrap();

        let err = service
            .progress_order_status(order.id, OrderStatus::Cancelled, None, &admin)
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::GoodsScannedOut { units: 2 }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.code(), "goods_scanned_out");
        assert_eq!(store.all_bookings().await.len(), 1);

        // Still blocked once the phase is done.
        let ready = service.complete_scan_phase(order.id, &actor).await.unwrap();
        assert_eq!(ready.status, OrderStatus::ReadyForDelivery);
        assert!(matches!(
            service
                .progress_order_status(order.id, OrderStatus::Cancelled, None, &admin)
                .await
                .unwrap_err(),
            FulfillmentError::GoodsScannedOut { units: 2 }
        ));

        let availability = service.get_availability(tents.id, None, &actor).await.unwrap();
        assert_eq!(availability.booked, 2);
        assert_eq!(availability.out, 2);
        let history = service.get_order_status_history(order.id, &actor).await.unwrap();
        assert_eq!(history.last().map(|h| h.status), Some(OrderStatus::ReadyForDelivery));
    }

    #[tokio::test]
    async fn unscanned_order_in_preparation_can_still_be_cancelled() {
        let (service, store, _bus) = setup();
        let tents = seed_asset(&store, "QR-TENT", 5, TrackingMethod::Batch).await;
        let order = seed_order(&store, CompanyId::new(), OrderStatus::InPreparation, &[(&tents, 2)]).await;
        seed_booking(&store, &order, &tents, 2).await;

        let cancelled = service
            .progress_order_status(order.id, OrderStatus::Cancelled, None, &Actor::admin(UserId::new()))
            .await
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(store.all_bookings().await.is_empty());
        let availability = service.get_availability(tents.id, None, &staff()).await.unwrap();
        assert_eq!(availability.available, 5);
    }

    #[tokio::test]
    async fn failed_reservation_leaves_no_partial_bookings() {
        let (service, store, _bus) = setup();
        let company = CompanyId::new();
        let stools = seed_asset(&store, "QR-STOOL", 10, TrackingMethod::Batch).await;
        let lamps = seed_asset(&store, "QR-LAMP", 1, TrackingMethod::Individual).await;
        let order = seed_order(&store, company, OrderStatus::Quoted, &[(&stools, 4), (&lamps, 2)]).await;

        let err = service
            .progress_order_status(order.id, OrderStatus::Confirmed, None, &Actor::client(UserId::new(), company))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FulfillmentError::InsufficientAvailability { requested: 2, available: 1, .. }
        ));
        assert!(store.all_bookings().await.is_empty());
        let history = service
            .get_order_status_history(order.id, &staff())
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_confirmations_never_overbook() {
        let (service, store, _bus) = setup();
        let speakers = seed_asset(&store, "QR-SPEAKER", 3, TrackingMethod::Individual).await;

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let company = CompanyId::new();
            let order = seed_order(&store, company, OrderStatus::Quoted, &[(&speakers, 1)]).await;
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                let client = Actor::client(UserId::new(), company);
                service
                    .progress_order_status(order.id, OrderStatus::Confirmed, None, &client)
                    .await
            }));
        }

        let mut confirmed = 0;
        let mut rejected = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => confirmed += 1,
                Err(FulfillmentError::InsufficientAvailability { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(confirmed, 3);
        assert_eq!(rejected, 5);
        let booked: u32 = store.all_bookings().await.iter().map(|b| b.quantity).sum();
        assert_eq!(booked, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_scans_of_one_asset_never_exceed_the_requirement() {
        let (service, store, _bus) = setup();
        let cables = seed_asset(&store, "QR-CABLE", 50, TrackingMethod::Batch).await;
        let order = seed_order(&store, CompanyId::new(), OrderStatus::InPreparation, &[(&cables, 5)]).await;

        let mut tasks = Vec::new();
        for _ in 0..6 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service
                    .record_scan(order.id, scan("QR-CABLE", ScanType::Outbound, Some(2)), &staff())
                    .await
            }));
        }

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(FulfillmentError::Scan(ScanRejection::OverScan { .. })) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(accepted, 2);
        let progress = service
            .scan_progress(order.id, ScanType::Outbound, &staff())
            .await
            .unwrap();
        assert_eq!(progress.total_scanned, 4);
        assert!(!progress.can_complete);
    }

    #[tokio::test]
    async fn batch_scans_need_a_quantity() {
        let (service, store, _bus) = setup();
        let cables = seed_asset(&store, "QR-CABLE", 50, TrackingMethod::Batch).await;
        let order = seed_order(&store, CompanyId::new(), OrderStatus::InPreparation, &[(&cables, 5)]).await;

        let err = service
            .record_scan(order.id, scan("QR-CABLE", ScanType::Outbound, None), &staff())
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Scan(ScanRejection::MissingBatchQuantity)));
    }

    #[tokio::test]
    async fn scans_outside_their_phase_or_order_are_rejected() {
        let (service, store, _bus) = setup();
        let cables = seed_asset(&store, "QR-CABLE", 50, TrackingMethod::Batch).await;
        seed_asset(&store, "QR-OTHER", 50, TrackingMethod::Batch).await;
        let order = seed_order(&store, CompanyId::new(), OrderStatus::InPreparation, &[(&cables, 5)]).await;

        let err = service
            .record_scan(order.id, scan("QR-CABLE", ScanType::Inbound, Some(1)), &staff())
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Scan(ScanRejection::WrongPhase { .. })));

        let err = service
            .record_scan(order.id, scan("QR-OTHER", ScanType::Outbound, Some(1)), &staff())
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Scan(ScanRejection::AssetNotInOrder { .. })));

        let err = service
            .record_scan(order.id, scan("QR-MISSING", ScanType::Outbound, Some(1)), &staff())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn clients_cannot_scan() {
        let (service, store, _bus) = setup();
        let company = CompanyId::new();
        let cables = seed_asset(&store, "QR-CABLE", 50, TrackingMethod::Batch).await;
        let order = seed_order(&store, company, OrderStatus::InPreparation, &[(&cables, 5)]).await;

        let err = service
            .record_scan(
                order.id,
                scan("QR-CABLE", ScanType::Outbound, Some(1)),
                &Actor::client(UserId::new(), company),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Unauthorized(AuthzError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn outbound_completion_moves_to_ready_for_delivery() {
        let (service, store, _bus) = setup();
        let cables = seed_asset(&store, "QR-CABLE", 50, TrackingMethod::Batch).await;
        let order = seed_order(&store, CompanyId::new(), OrderStatus::InPreparation, &[(&cables, 5)]).await;
        let actor = staff();

        let err = service.complete_scan_phase(order.id, &actor).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::IncompleteScan { scanned: 0, required: 5, .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        service
            .record_scan(order.id, scan("QR-CABLE", ScanType::Outbound, Some(5)), &actor)
            .await
            .unwrap();
        let order = service.complete_scan_phase(order.id, &actor).await.unwrap();
        assert_eq!(order.status, OrderStatus::ReadyForDelivery);

        let history = service.get_order_status_history(order.id, &actor).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].note.as_deref(), Some("OUTBOUND scanning complete"));
    }

    #[tokio::test]
    async fn direct_move_to_ready_for_delivery_requires_full_outbound_scan() {
        let (service, store, _bus) = setup();
        let cables = seed_asset(&store, "QR-CABLE", 50, TrackingMethod::Batch).await;
        let order = seed_order(&store, CompanyId::new(), OrderStatus::InPreparation, &[(&cables, 5)]).await;
        let actor = staff();

        service
            .record_scan(order.id, scan("QR-CABLE", ScanType::Outbound, Some(4)), &actor)
            .await
            .unwrap();
        let err = service
            .progress_order_status(order.id, OrderStatus::ReadyForDelivery, None, &actor)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::IncompleteScan { scan_type: ScanType::Outbound, scanned: 4, required: 5 }
        ));
        assert!(service.get_order_status_history(order.id, &actor).await.unwrap().is_empty());

        service
            .record_scan(order.id, scan("QR-CABLE", ScanType::Outbound, Some(1)), &actor)
            .await
            .unwrap();
        let ready = service
            .progress_order_status(order.id, OrderStatus::ReadyForDelivery, None, &actor)
            .await
            .unwrap();
        assert_eq!(ready.status, OrderStatus::ReadyForDelivery);
    }

    #[tokio::test]
    async fn closing_requires_every_unit_back_and_releases_bookings() {
        let (service, store, _bus) = setup();
        let cables = seed_asset(&store, "QR-CABLE", 50, TrackingMethod::Batch).await;
        let order = seed_order(&store, CompanyId::new(), OrderStatus::AwaitingReturn, &[(&cables, 5)]).await;
        seed_booking(&store, &order, &cables, 5).await;
        seed_scan(&store, &order, &cables, ScanType::Outbound, 5).await;
        let actor = staff();

        service
            .record_scan(order.id, scan("QR-CABLE", ScanType::Inbound, Some(3)), &actor)
            .await
            .unwrap();
        let err = service
            .progress_order_status(order.id, OrderStatus::Closed, None, &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::IncompleteScan { scanned: 3, required: 5, .. }));
        assert_eq!(store.all_bookings().await.len(), 1);

        service
            .record_scan(order.id, scan("QR-CABLE", ScanType::Inbound, Some(2)), &actor)
            .await
            .unwrap();
        let closed = service.complete_scan_phase(order.id, &actor).await.unwrap();

        assert_eq!(closed.status, OrderStatus::Closed);
        assert!(store.all_bookings().await.is_empty());
        let availability = service.get_availability(cables.id, None, &actor).await.unwrap();
        assert_eq!(availability.out, 0);
        assert_eq!(availability.available, 50);
    }

    #[tokio::test]
    async fn damaged_return_records_a_condition_change() {
        let (service, store, _bus) = setup();
        let sofa = seed_asset(&store, "QR-SOFA", 1, TrackingMethod::Individual).await;
        let order = seed_order(&store, CompanyId::new(), OrderStatus::AwaitingReturn, &[(&sofa, 1)]).await;
        let actor = staff();

        let mut returned = scan("QR-SOFA", ScanType::Inbound, None);
        returned.condition = Condition::Red;
        returned.notes = Some("torn cushion".into());
        returned.photos = vec!["https://photos.example/sofa.jpg".into()];
        service.record_scan(order.id, returned, &actor).await.unwrap();

        let changes = store.condition_changes(sofa.id).await;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous, Condition::Green);
        assert_eq!(changes[0].new, Condition::Red);
        assert_eq!(changes[0].order_id, Some(order.id));

        let availability = service.get_availability(sofa.id, None, &actor).await.unwrap();
        assert_eq!(availability.maintenance, 1);
        assert_eq!(availability.available, 0);
        assert_eq!(availability.status, AssetStatus::Maintenance);
    }

    #[tokio::test]
    async fn clients_only_see_their_own_company() {
        let (service, store, _bus) = setup();
        let order = seed_order(&store, CompanyId::new(), OrderStatus::Quoted, &[]).await;
        let outsider = Actor::client(UserId::new(), CompanyId::new());

        let err = service
            .progress_order_status(order.id, OrderStatus::Confirmed, None, &outsider)
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Unauthorized(AuthzError::CompanyMismatch { .. })));

        let err = service
            .get_order_status_history(order.id, &outsider)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn history_is_ordered_and_strictly_increasing() {
        let (service, store, _bus) = setup();
        let order = seed_order(&store, CompanyId::new(), OrderStatus::Draft, &[]).await;
        let admin = Actor::admin(UserId::new());

        for next in [OrderStatus::Submitted, OrderStatus::PricingReview, OrderStatus::Quoted] {
            service
                .progress_order_status(order.id, next, None, &admin)
                .await
                .unwrap();
        }

        let history = service.get_order_status_history(order.id, &admin).await.unwrap();
        let statuses: Vec<_> = history.iter().map(|h| h.status).collect();
        assert_eq!(
            statuses,
            vec![OrderStatus::Submitted, OrderStatus::PricingReview, OrderStatus::Quoted]
        );
        assert!(history.windows(2).all(|w| w[0].recorded_at < w[1].recorded_at));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (service, _store, _bus) = setup();
        let err = service
            .progress_order_status(OrderId::new(), OrderStatus::Submitted, None, &staff())
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::NotFound { entity: "order", .. }));
    }

    struct Recording {
        tx: mpsc::UnboundedSender<(NotificationType, OrderId)>,
    }

    #[async_trait]
    impl NotificationDispatcher for Recording {
        async fn send(&self, notification: NotificationType, order_id: OrderId) -> Result<(), NotificationError> {
            let _ = self.tx.send((notification, order_id));
            Ok(())
        }
    }

    #[tokio::test]
    async fn worker_delivers_notifications_for_committed_transitions() {
        let (service, store, bus) = setup();
        let company = CompanyId::new();
        let order = seed_order(&store, company, OrderStatus::Quoted, &[]).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = NotificationWorker::spawn(
            &bus,
            Arc::new(Recording { tx }),
            RetryPolicy::fixed(3, Duration::from_millis(1)),
        );

        service
            .progress_order_status(order.id, OrderStatus::Confirmed, None, &Actor::client(UserId::new(), company))
            .await
            .unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered, (NotificationType::OrderConfirmed, order.id));

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn rejected_transitions_publish_nothing() {
        let (service, store, bus) = setup();
        let order = seed_order(&store, CompanyId::new(), OrderStatus::Draft, &[]).await;
        let mut subscription: Subscription<LifecycleEnvelope> = bus.subscribe();

        let _ = service
            .progress_order_status(order.id, OrderStatus::Closed, None, &Actor::admin(UserId::new()))
            .await
            .unwrap_err();

        assert!(subscription.try_recv().is_err());
    }
}
