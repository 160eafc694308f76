use bytes::Bytes;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use storage::string::HashMetaValue;
use storage::string::StringValue;

fn bench_string_value_roundtrip(c: &mut Criterion) {
	c.bench_function("string_value_encode", |b| {
		let value = StringValue::new_with_ttl(Bytes::from_static(b"the quick brown fox"), 1_000_000);
		b.iter(|| value.encode())
	});

	c.bench_function("string_value_decode", |b| {
		let value = StringValue::new_with_ttl(Bytes::from_static(b"the quick brown fox"), 1_000_000);
		let encoded = value.encode();
		b.iter(|| StringValue::decode(&encoded).unwrap())
	});
}

fn bench_hash_meta_roundtrip(c: &mut Criterion) {
	c.bench_function("hash_meta_encode", |b| {
		let meta = HashMetaValue::new(1, 100);
		b.iter(|| meta.encode())
	});
}

criterion_group!(benches, bench_string_value_roundtrip, bench_hash_meta_roundtrip);
criterion_main!(benches);
