use criterion::{Criterion, black_box, criterion_group, criterion_main};
use phonic::crypto::{EncryptMode, TransportSecrets, VoiceGroupCrypto};
use phonic::rtp::{self, SequenceClock};

fn packets(c: &mut Criterion) {
    let mut crypto = VoiceGroupCrypto::new(&TransportSecrets {
        mode: EncryptMode::Aes256Gcm,
        secret_key: [7; 32],
        ssrc: 42,
    });

    let mut opus = vec![0u8; 160];
    fastrand::fill(&mut opus);

    let mut clock = SequenceClock::random();
    c.bench_function("encode packet (aes256gcm, 160 bytes)", |b| {
        b.iter(|| {
            let (sequence, timestamp) = clock.next();
            let header = rtp::encode_header(sequence, timestamp, 42);
            let sealed = crypto.encrypt(&opus, &header).expect("should seal frame");
            black_box(rtp::encode_packet(&header, &sealed))
        });
    });

    let header = rtp::encode_header(1, 960, 42);
    let sealed = crypto.encrypt(&opus, &header).expect("should seal frame");
    let datagram = rtp::encode_packet(&header, &sealed);

    c.bench_function("decode packet (aes256gcm, 160 bytes)", |b| {
        b.iter(|| black_box(rtp::decode_packet(black_box(&datagram), &crypto).expect("valid packet")));
    });

    c.bench_function("sequence clock (1000 frames)", |b| {
        b.iter(|| {
            let mut clock = SequenceClock::new(u16::MAX - 500, u32::MAX - 480_000);
            for _ in 0..1000 {
                black_box(clock.next());
            }
        });
    });
}

criterion_group!(benches, packets);
criterion_main!(benches);
