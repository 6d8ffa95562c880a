#![allow(missing_docs)]

use std::sync::Arc;

use jsongroup::{FieldCache, GroupObject, Marshaller, Options};
use rayon::prelude::*;

macro_rules! fixture_types {
    ($($name:ident = $value:expr),* $(,)?) => {
        $(
            #[derive(GroupObject)]
            struct $name {
                #[jsongroup(json = "f", groups = "public")]
                pub f: i32,
            }
        )*

        /// Marshals one value of the `i`-th fixture type.
        fn marshal_nth(m: &Marshaller, i: usize) -> Vec<u8> {
            let mut n = 0;
            $(
                if i == n {
                    return m.marshal(&$name { f: $value }, &["public"]).unwrap();
                }
                n += 1;
            )*
            let _ = n;
            unreachable!("no fixture type {i}")
        }
    };
}

fixture_types!(
    Type1 = 1,
    Type2 = 2,
    Type3 = 3,
    Type4 = 4,
    Type5 = 5,
    Type6 = 6,
    Type7 = 7,
    Type8 = 8,
);

fn marshaller(capacity: usize) -> (Marshaller, Arc<FieldCache>) {
    let cache = Arc::new(FieldCache::new(capacity));
    let m = Marshaller::with_cache(Options::default(), Arc::clone(&cache));
    (m, cache)
}

#[test]
fn test_capacity_is_never_exceeded() {
    let (m, cache) = marshaller(5);
    for i in 0..5 {
        marshal_nth(&m, i);
    }
    let before = cache.stats();
    assert_eq!(before.size, 5);
    assert_eq!(before.misses, 5);

    marshal_nth(&m, 5);
    marshal_nth(&m, 6);
    assert_eq!(cache.stats().size, 5);
    assert_eq!(cache.stats().evictions, 2);

    // Type1 was the least recently used entry and is gone.
    assert_eq!(marshal_nth(&m, 0), br#"{"f":1}"#);
    let after = cache.stats();
    assert!(after.misses > before.misses);
    assert!(after.size <= 5);
    cache.verify().unwrap();
}

#[test]
fn test_hits_promote_entries() {
    let (m, cache) = marshaller(2);
    marshal_nth(&m, 0);
    marshal_nth(&m, 1);
    marshal_nth(&m, 0);
    marshal_nth(&m, 2);

    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.evictions), (1, 3, 1));
    assert!(cache.contains(std::any::type_name::<Type1>()));
    assert!(!cache.contains(std::any::type_name::<Type2>()));
}

#[test]
fn test_shrink_and_disable() {
    let (m, cache) = marshaller(8);
    for i in 0..8 {
        marshal_nth(&m, i);
    }
    cache.set_capacity(3).unwrap();
    assert_eq!(cache.stats().size, 3);
    cache.verify().unwrap();

    cache.set_capacity(0).unwrap();
    assert_eq!(cache.stats().size, 0);
    let misses = cache.stats().misses;
    marshal_nth(&m, 0);
    marshal_nth(&m, 0);
    assert_eq!(cache.stats().misses, misses + 2);
    assert_eq!(cache.stats().size, 0);
}

#[test]
fn test_marshaller_builds_its_own_cache() {
    let m = Marshaller::new(Options::default().with_cache_capacity(4));
    assert_eq!(m.cache().stats().capacity, 4);
    marshal_nth(&m, 3);
    assert_eq!(m.cache().stats().size, 1);
}

#[test]
fn test_stats_serialize() {
    let (m, cache) = marshaller(4);
    marshal_nth(&m, 0);
    marshal_nth(&m, 0);
    let json = serde_json::to_value(cache.stats()).unwrap();
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["hit_ratio"], 0.5);
}

#[test]
fn test_concurrent_access_keeps_cache_consistent() {
    let (m, cache) = marshaller(3);

    (0..2_000usize).into_par_iter().for_each(|i| {
        let bytes = marshal_nth(&m, i % 8);
        assert_eq!(bytes, format!(r#"{{"f":{}}}"#, i % 8 + 1).into_bytes());
        if i % 97 == 0 {
            cache.set_capacity(2 + i % 3).unwrap();
        }
    });

    cache.verify().unwrap();
    let stats = cache.stats();
    assert!(stats.size <= stats.capacity);
    assert_eq!(stats.hits + stats.misses, 2_000);
}

#[test]
fn test_concurrent_same_type_collapses() {
    let (m, cache) = marshaller(16);
    (0..256usize).into_par_iter().for_each(|_| {
        marshal_nth(&m, 4);
    });
    assert_eq!(cache.stats().size, 1);
    cache.verify().unwrap();
}
