use std::fs;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qfs_cas::{hash_bytes, hash_file, BlobStore};
use tempfile::TempDir;

fn bench_hash_bytes(c: &mut Criterion) {
    let small = vec![0x5au8; 4 * 1024];
    let large = vec![0x5au8; 4 * 1024 * 1024];

    c.bench_function("hash_bytes_4k", |b| {
        b.iter(|| hash_bytes(black_box(&small)))
    });
    c.bench_function("hash_bytes_4m", |b| {
        b.iter(|| hash_bytes(black_box(&large)))
    });
}

fn bench_hash_file(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("input");
    fs::write(&path, vec![0x5au8; 4 * 1024 * 1024]).unwrap();

    c.bench_function("hash_file_4m", |b| b.iter(|| hash_file(black_box(&path))));
}

fn bench_promote_dedup(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let store = BlobStore::open(temp.path().join("blobs")).unwrap();

    let data = vec![0x5au8; 64 * 1024];
    let seed = temp.path().join("seed");
    fs::write(&seed, &data).unwrap();
    let hash = hash_file(&seed).unwrap();
    store.promote(&seed, &hash).unwrap();

    // every iteration hits the already-present blob, the common rewrite path
    c.bench_function("promote_duplicate_64k", |b| {
        b.iter(|| {
            let staging = temp.path().join("staging");
            fs::write(&staging, &data).unwrap();
            store.promote(black_box(&staging), black_box(&hash)).unwrap();
        })
    });
}

criterion_group!(benches, bench_hash_bytes, bench_hash_file, bench_promote_dedup);
criterion_main!(benches);
