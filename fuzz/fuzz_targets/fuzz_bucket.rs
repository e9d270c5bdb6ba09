#![no_main]

use bytes::BytesMut;
use levin_protocol::config::FramerLimits;
use levin_protocol::{read_bucket, BucketCodec, BucketHeader};
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let limits = FramerLimits {
        max_payload_size: 1 << 16,
        ..FramerLimits::default()
    };

    let _ = BucketHeader::parse(data, &limits);
    let _ = read_bucket(&mut &data[..], &limits);

    let mut buf = BytesMut::from(data);
    let mut codec = BucketCodec::new(limits);
    while let Ok(Some(bucket)) = codec.decode(&mut buf) {
        let _ = bucket.section();
    }
});
