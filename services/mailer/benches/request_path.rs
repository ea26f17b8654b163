use std::time::Duration;

use bulk_relay_mailer::mail::{parse_recipients, sanitize_body, sanitize_subject};
use bulk_relay_mailer::QuotaTracker;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn recipient_field(count: usize) -> String {
    (0..count)
        .map(|idx| {
            if idx % 5 == 0 {
                format!(" not-an-address-{idx}")
            } else {
                format!("user{}@example{}.com", idx % 20, idx % 3)
            }
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_validation");
    group
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));

    for count in [28usize, 500] {
        let field = recipient_field(count);
        group.bench_with_input(BenchmarkId::new("parse_recipients", count), &field, |b, field| {
            b.iter(|| black_box(parse_recipients(field)));
        });
    }

    let subject = "  Quarterly \t update   for\nthe team  ".repeat(20);
    let body = "Line one\r\nLine two\rLine three\n".repeat(500);
    group.bench_function("sanitize_content", |b| {
        b.iter(|| {
            black_box(sanitize_subject(&subject, 200));
            black_box(sanitize_body(&body, 10_000));
        });
    });

    group.finish();
}

fn bench_quota(c: &mut Criterion) {
    let tracker = QuotaTracker::new(u64::MAX);

    c.bench_function("quota_reserve_commit", |b| {
        b.iter(|| {
            let reservation = tracker
                .reserve(black_box("a@gmail.com"), 3)
                .expect("quota available");
            black_box(reservation.commit(3))
        });
    });
}

criterion_group!(benches, bench_validation, bench_quota);
criterion_main!(benches);
