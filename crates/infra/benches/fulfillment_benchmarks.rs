use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use rentflow_auth::{Actor, Role};
use rentflow_core::{CompanyId, DateRange, OrderId, ScanEventId, UserId};
use rentflow_fulfillment::transition::is_allowed;
use rentflow_fulfillment::{
    Asset, AssetBooking, Condition, NewScan, Order, OrderItem, OrderStatus, ScanEvent,
    ScanProgress, ScanType, TrackingMethod, required_quantities,
};
use rentflow_infra::{FulfillmentService, FulfillmentStore, InMemoryFulfillmentStore, StoreTx};
use rentflow_events::InMemoryEventBus;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn window() -> DateRange {
    let start = Utc::now() + Duration::days(7);
    DateRange::new(start, start + Duration::days(1)).unwrap()
}

fn bench_transition_matrix(c: &mut Criterion) {
    c.bench_function("transition_matrix_full_scan", |b| {
        b.iter(|| {
            let mut allowed = 0u32;
            for role in Role::ALL {
                for from in OrderStatus::ALL {
                    for to in OrderStatus::ALL {
                        if is_allowed(black_box(from), black_box(to), role) {
                            allowed += 1;
                        }
                    }
                }
            }
            black_box(allowed)
        });
    });
}

fn bench_scan_progress(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_progress_compute");

    for lines in [1usize, 10, 100].iter() {
        let order_id = OrderId::new();
        let items: Vec<OrderItem> = (0..*lines)
            .map(|_| OrderItem::new(order_id, rentflow_core::AssetId::new(), 20).unwrap())
            .collect();
        let required = required_quantities(&items);
        let events: Vec<ScanEvent> = items
            .iter()
            .flat_map(|item| {
                (0..10).map(move |_| ScanEvent {
                    id: ScanEventId::new(),
                    order_id,
                    asset_id: item.asset_id,
                    scan_type: ScanType::Outbound,
                    quantity: 1,
                    condition: Condition::Green,
                    notes: None,
                    photos: Vec::new(),
                    actor_id: UserId::new(),
                    scanned_at: Utc::now(),
                })
            })
            .collect();

        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::new("lines", lines), &events, |b, events| {
            b.iter(|| {
                black_box(ScanProgress::compute(
                    order_id,
                    ScanType::Outbound,
                    &required,
                    events,
                ))
            });
        });
    }

    group.finish();
}

fn bench_availability(c: &mut Criterion) {
    let mut group = c.benchmark_group("availability_lookup");
    let rt = runtime();

    for bookings in [10usize, 100, 1000].iter() {
        let store = InMemoryFulfillmentStore::new();
        let asset = Asset::new("Chair", "QR-CHAIR", 1_000_000, TrackingMethod::Batch);
        rt.block_on(async {
            store.insert_asset(asset.clone()).await;
            let mut seeded = Vec::with_capacity(*bookings);
            for i in 0..*bookings {
                let order = Order::new(
                    format!("ORD-{i}"),
                    CompanyId::new(),
                    OrderStatus::Confirmed,
                    window(),
                    "Venue",
                    Utc::now(),
                );
                seeded.push(AssetBooking::new(order.id, asset.id, 1, Utc::now()));
                store.insert_order(order, Vec::new()).await;
            }
            let mut tx = store.begin().await.unwrap();
            tx.insert_bookings(&seeded).await.unwrap();
            tx.commit().await.unwrap();
        });

        let service = FulfillmentService::new(store, Arc::new(InMemoryEventBus::new()));
        let actor = Actor::admin(UserId::new());

        group.bench_with_input(BenchmarkId::new("bookings", bookings), bookings, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(
                        service
                            .get_availability(asset.id, Some(window()), &actor)
                            .await
                            .unwrap(),
                    )
                })
            });
        });
    }

    group.finish();
}

fn bench_record_scan(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("record_batch_scan", |b| {
        let store = InMemoryFulfillmentStore::new();
        let asset = Asset::new("Cable", "QR-CABLE", 1_000_000, TrackingMethod::Batch);
        let order = Order::new(
            "ORD-SCAN",
            CompanyId::new(),
            OrderStatus::InPreparation,
            window(),
            "Venue",
            Utc::now(),
        );
        let item = OrderItem::new(order.id, asset.id, 1_000_000).unwrap();
        rt.block_on(async {
            store.insert_asset(asset.clone()).await;
            store.insert_order(order.clone(), vec![item]).await;
        });
        let service = FulfillmentService::new(store, Arc::new(InMemoryEventBus::new()));
        let actor = Actor::fulfillment(UserId::new());

        b.iter(|| {
            let scan = NewScan {
                qr_code: "QR-CABLE".to_string(),
                scan_type: ScanType::Outbound,
                quantity: Some(1),
                condition: Condition::Green,
                notes: None,
                photos: Vec::new(),
            };
            rt.block_on(async { black_box(service.record_scan(order.id, scan, &actor).await.unwrap()) })
        });
    });
}

criterion_group!(
    benches,
    bench_transition_matrix,
    bench_scan_progress,
    bench_availability,
    bench_record_scan
);
criterion_main!(benches);
