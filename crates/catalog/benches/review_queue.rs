use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, TimeZone, Utc};
use discoverly_catalog::{
    moderation::{self, PageRequest},
    ModerationChange, Product, ProductDraft, ProductStatus,
};
use discoverly_core::{Email, ProductId};

fn catalog(size: usize) -> Vec<Product> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let owner = Email::parse("bench@example.com").unwrap();
    let statuses = [ProductStatus::Pending, ProductStatus::Accepted, ProductStatus::Rejected];

    (0..size)
        .map(|i| {
            let mut p = Product::submit(
                ProductId::new(),
                owner.clone(),
                ProductDraft {
                    product_name: format!("product-{i}"),
                    link: "https://example.com".to_string(),
                    tags: vec![if i % 2 == 0 { "ai" } else { "web" }.to_string()],
                    ..ProductDraft::default()
                },
                base + Duration::seconds((i * 7919 % size) as i64),
            )
            .unwrap();
            let status = statuses[i % statuses.len()];
            p.apply_moderation(&ModerationChange {
                status: Some(status).filter(|s| *s != ProductStatus::Pending),
                is_featured: Some(i % 5 == 0),
            });
            p.upvote_count = (i % 97) as u64;
            p
        })
        .collect()
}

fn bench_review_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("review_queue");
    for size in [100usize, 1_000, 10_000] {
        let products = catalog(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &products, |b, products| {
            b.iter(|| black_box(moderation::review_queue().run(products)));
        });
    }
    group.finish();
}

fn bench_publication_sets(c: &mut Criterion) {
    let products = catalog(10_000);
    let mut group = c.benchmark_group("publication_sets");

    group.bench_function("featured", |b| {
        b.iter(|| black_box(moderation::featured().run(&products)));
    });
    group.bench_function("trending", |b| {
        b.iter(|| black_box(moderation::trending().run(&products)));
    });
    group.bench_function("accepted_page_3_tag_ai", |b| {
        let request = PageRequest::new(Some(3), None).unwrap();
        b.iter(|| black_box(moderation::accepted_page(Some("ai"), request).run(&products)));
    });

    group.finish();
}

criterion_group!(benches, bench_review_queue, bench_publication_sets);
criterion_main!(benches);
