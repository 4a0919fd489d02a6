use criterion::{criterion_group, criterion_main, Criterion};
use domain::{CustomerId, Money, Order, OrderLine};

fn bench_create_order(c: &mut Criterion) {
    c.bench_function("domain/create_order", |b| {
        b.iter(|| {
            let lines = vec![
                OrderLine::new("ITEM-001", "Widget", Money::from_cents(250), 2).unwrap(),
                OrderLine::new("ITEM-002", "Gadget", Money::from_cents(1200), 1).unwrap(),
            ];
            Order::new(CustomerId::new(), lines).unwrap()
        });
    });
}

fn bench_complete_order(c: &mut Criterion) {
    c.bench_function("domain/complete_order", |b| {
        b.iter(|| {
            let lines =
                vec![OrderLine::new("ITEM-001", "Widget", Money::from_cents(250), 2).unwrap()];
            let mut order = Order::new(CustomerId::new(), lines).unwrap();
            order.complete().unwrap();
            order
        });
    });
}

criterion_group!(benches, bench_create_order, bench_complete_order);
criterion_main!(benches);
