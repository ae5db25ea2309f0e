// Datum codec benchmarks.
//
// Covers vault datum encode/decode, generic Plutus data decoding at
// increasing byte-string sizes, and policy id derivation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use fnft_protocol::asset::{AssetName, KeyHash, NativeScript, PolicyId, Unit};
use fnft_protocol::codec::PlutusData;
use fnft_protocol::vault::VaultDatum;

fn sample_datum() -> VaultDatum {
    let collectible = Unit::new(
        PolicyId::from_bytes([0x37; 28]),
        AssetName::from_label("nft1").unwrap(),
    );
    let datum = VaultDatum::new(
        PolicyId::from_bytes([0x1a; 28]),
        AssetName::from_label("FNFT_nft1").unwrap(),
        &collectible,
        1_000_000,
    );
    datum.with_remaining(700_000).unwrap()
}

fn bench_datum_encode(c: &mut Criterion) {
    let datum = sample_datum();
    c.bench_function("datum/encode", |b| {
        b.iter(|| black_box(&datum).encode().unwrap());
    });
}

fn bench_datum_decode(c: &mut Criterion) {
    let bytes = sample_datum().encode().unwrap();
    c.bench_function("datum/decode", |b| {
        b.iter(|| VaultDatum::decode(black_box(&bytes)).unwrap());
    });
}

fn bench_plutus_chunked_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("plutus/decode_bytes");

    for size in [32usize, 64, 256, 4096] {
        let encoded = PlutusData::constr(0, vec![PlutusData::Bytes(vec![0xab; size])])
            .to_cbor()
            .unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| PlutusData::from_cbor(encoded).unwrap());
        });
    }

    group.finish();
}

fn bench_policy_id(c: &mut Criterion) {
    let script = NativeScript::single_signer(KeyHash::from_bytes([7; 28]));
    c.bench_function("asset/policy_id_of", |b| {
        b.iter(|| black_box(&script).policy_id().unwrap());
    });
}

criterion_group!(
    benches,
    bench_datum_encode,
    bench_datum_decode,
    bench_plutus_chunked_bytes,
    bench_policy_id,
);
criterion_main!(benches);
