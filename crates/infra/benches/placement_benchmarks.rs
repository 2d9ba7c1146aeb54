use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use storefront_core::{Money, ProductId, UserId};
use storefront_infra::store::InMemoryDatabase;
use storefront_infra::{InMemoryOrderService, LogPaymentNotifier, OrderOperations};
use storefront_orders::{OrderLine, PaymentMethod, PlaceOrder};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn request(user: i64, line_count: usize) -> PlaceOrder {
    PlaceOrder {
        user_id: UserId::new(user),
        amount: Money::from_minor(10_000),
        shipping_amount: Money::from_minor(500),
        shipping_address: "Nairobi".to_string(),
        lines: (0..line_count)
            .map(|i| OrderLine::new(ProductId::new(i as i64 + 1), 1, Money::from_minor(100)))
            .collect(),
        payment_method: PaymentMethod::Mpesa,
    }
}

async fn seeded(line_count: usize) -> (InMemoryDatabase, InMemoryOrderService) {
    let db = InMemoryDatabase::new();
    for i in 0..line_count {
        db.put_product(ProductId::new(i as i64 + 1), u32::MAX).await;
    }
    let service = InMemoryOrderService::in_memory(&db, Arc::new(LogPaymentNotifier));
    (db, service)
}

fn bench_placement_latency(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("placement_latency");

    for line_count in [1usize, 5, 20] {
        let (_db, service) = rt.block_on(seeded(line_count));
        group.throughput(Throughput::Elements(line_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(line_count),
            &line_count,
            |b, &line_count| {
                b.iter(|| {
                    let placed = rt
                        .block_on(service.place_order(request(1, line_count)))
                        .unwrap();
                    black_box(placed);
                });
            },
        );
    }

    group.finish();
}

fn bench_contended_placement(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("contended_placement");
    group.sample_size(50);

    for concurrency in [2usize, 8, 32] {
        let (_db, service) = rt.block_on(seeded(1));
        let service = Arc::new(service);
        group.throughput(Throughput::Elements(concurrency as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, &concurrency| {
                b.iter(|| {
                    rt.block_on(async {
                        let handles: Vec<_> = (0..concurrency)
                            .map(|i| {
                                let service = Arc::clone(&service);
                                tokio::spawn(async move {
                                    service.place_order(request(i as i64 + 1, 1)).await
                                })
                            })
                            .collect();
                        for handle in handles {
                            black_box(handle.await.unwrap().unwrap());
                        }
                    });
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_placement_latency, bench_contended_placement);
criterion_main!(benches);
