use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use levin_protocol::protocol::HandshakeRequest;
use levin_protocol::{decode_section, encode_section, Array, ByteString, Section, TypeTag};

fn peer_list_section(peers: usize) -> Section {
    let mut list = Array::new(TypeTag::Object);
    for i in 0..peers {
        let addr = Section::new()
            .with("m_ip", i as u32)
            .with("m_port", 18080u16);
        let peer = Section::new()
            .with("adr", Section::new().with("addr", addr).with("type", 1u8))
            .with("id", i as u64)
            .with("last_seen", i as i64);
        #[allow(clippy::unwrap_used)]
        list.push(peer).unwrap();
    }
    Section::new()
        .with("node_data", Section::new().with("network_id", ByteString::from([0u8; 16])))
        .with("local_peerlist_new", list)
}

#[allow(clippy::unwrap_used)]
fn bench_storage(c: &mut Criterion) {
    let mut group = c.benchmark_group("portable_storage");

    let handshake = HandshakeRequest::default().to_section();
    group.bench_function("encode_handshake", |b| {
        b.iter(|| encode_section(&handshake).unwrap())
    });
    let handshake_bytes = encode_section(&handshake).unwrap();
    group.bench_function("decode_handshake", |b| {
        b.iter(|| decode_section(&handshake_bytes).unwrap())
    });

    for &peers in &[16usize, 250, 1000] {
        let section = peer_list_section(peers);
        let bytes = encode_section(&section).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_function(format!("encode_peerlist_{peers}"), |b| {
            b.iter_batched(
                || section.clone(),
                |s| encode_section(&s).unwrap(),
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("decode_peerlist_{peers}"), |b| {
            b.iter(|| decode_section(&bytes).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_storage);
criterion_main!(benches);
