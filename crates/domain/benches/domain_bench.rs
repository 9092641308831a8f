use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Money, Order, OrderStatus};

fn bench_create_order(c: &mut Criterion) {
    c.bench_function("domain/create_order", |b| {
        b.iter(|| {
            Order::create(
                "product-1",
                "customer-1",
                "seller-1",
                Money::from_cents(1000),
                2,
            )
            .unwrap()
        });
    });
}

fn bench_full_status_walk(c: &mut Criterion) {
    c.bench_function("domain/full_status_walk", |b| {
        b.iter(|| {
            let mut order = Order::create(
                "product-1",
                "customer-1",
                "seller-1",
                Money::from_cents(1000),
                2,
            )
            .unwrap();
            order.update_status(OrderStatus::Accepted).unwrap();
            order.update_status(OrderStatus::ShippingInProgress).unwrap();
            order.update_status(OrderStatus::Shipped).unwrap();
            order.take_domain_events()
        });
    });
}

fn bench_parse_status(c: &mut Criterion) {
    c.bench_function("domain/parse_status", |b| {
        b.iter(|| {
            "Shipping In Progress"
                .parse::<OrderStatus>()
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_create_order,
    bench_full_status_walk,
    bench_parse_status,
);
criterion_main!(benches);
