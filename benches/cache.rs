#![allow(missing_docs)]

use criterion::{Criterion, criterion_group, criterion_main};
use jsongroup::{FieldCache, GroupObject, Marshaller, Options};
use std::hint::black_box;
use std::sync::Arc;

#[derive(GroupObject)]
struct Wide {
    #[jsongroup(json = "a", groups = "public")]
    pub a: u32,
    #[jsongroup(json = "b", groups = "public,admin")]
    pub b: u32,
    #[jsongroup(json = "c", groups = "admin")]
    pub c: u32,
    #[jsongroup(json = "d,omitempty", groups = "public")]
    pub d: String,
    #[jsongroup(json = "e,omitzero", groups = "internal")]
    pub e: i64,
    #[jsongroup(json = "f", groups = "public")]
    pub f: bool,
}

fn wide() -> Wide {
    Wide {
        a: 1,
        b: 2,
        c: 3,
        d: "d".into(),
        e: 0,
        f: true,
    }
}

fn bench_cache(c: &mut Criterion) {
    let value = wide();
    let mut group = c.benchmark_group("Field Cache");

    // 1. Warm cache: every call is a hit
    let warm = Marshaller::new(Options::default());
    group.bench_function("marshal_warm_cache", |b| {
        b.iter(|| warm.marshal(black_box(&value), &["public"]).expect("marshal failed"));
    });

    // 2. Disabled cache: every call resolves the field table
    let cold = Marshaller::with_cache(Options::default(), Arc::new(FieldCache::new(0)));
    group.bench_function("marshal_no_cache", |b| {
        b.iter(|| cold.marshal(black_box(&value), &["public"]).expect("marshal failed"));
    });

    // 3. Raw lookup
    let cache = FieldCache::default();
    group.bench_function("lookup_hit", |b| {
        b.iter(|| {
            cache
                .fields(black_box(&value), "groups")
                .expect("lookup failed")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_cache);
criterion_main!(benches);
