use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use levin_protocol::config::FramerLimits;
use levin_protocol::{read_bucket, Bucket, BucketCodec, ByteString, Command, Section};
use std::io::Cursor;
use tokio_util::codec::{Decoder, Encoder};

#[allow(clippy::unwrap_used)]
fn bench_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_framing");
    let limits = FramerLimits::default();

    for &size in &[64usize, 4096, 65536, 1024 * 1024] {
        let section = Section::new().with("blob", ByteString::from(vec![0xA5u8; size]));
        let bucket = Bucket::request(Command::TimedSync, &section).unwrap();
        let bytes = bucket.to_bytes();
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_function(format!("codec_encode_{size}b"), |b| {
            let mut codec = BucketCodec::default();
            b.iter(|| {
                let mut buf = BytesMut::with_capacity(bytes.len());
                codec.encode(bucket.clone(), &mut buf).unwrap();
            })
        });
        group.bench_function(format!("codec_decode_{size}b"), |b| {
            let mut codec = BucketCodec::default();
            b.iter(|| {
                let mut buf = BytesMut::from(&bytes[..]);
                codec.decode(&mut buf).unwrap().unwrap()
            })
        });
        group.bench_function(format!("read_bucket_{size}b"), |b| {
            b.iter(|| read_bucket(&mut Cursor::new(&bytes[..]), &limits).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bucket);
criterion_main!(benches);
