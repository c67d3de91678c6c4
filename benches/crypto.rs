use criterion::{Criterion, black_box, criterion_group, criterion_main};
use phonic::crypto::{EncryptMode, TransportSecrets, VoiceGroupCrypto};
use phonic::rtp;
use phonic_types::RTP_KEY_LEN;

const SECRET_KEY: &str = "fb5e9f96f291742023f321c7f4f967a2d90f4e7dadb2d9bd66774ad3ebb3ac5d";

// A typical 64 kbps voice frame and the largest frame Opus can produce.
const FRAME_SIZES: &[usize] = &[160, 1275];

fn crypto(mode: EncryptMode) -> VoiceGroupCrypto {
    let secret_key: [u8; RTP_KEY_LEN] = hex::decode(SECRET_KEY)
        .expect("valid hex encoded bytes")
        .try_into()
        .expect("valid secret key");

    VoiceGroupCrypto::new(&TransportSecrets {
        mode,
        secret_key,
        ssrc: 1,
    })
}

fn seal_frames(c: &mut Criterion) {
    let modes = &[
        EncryptMode::Aes256Gcm,
        EncryptMode::XChaCha20Poly1305,
        EncryptMode::XSalsa20Poly1305,
    ];
    let header = rtp::encode_header(1, 960, 1);

    for mode in modes {
        let mut crypto = crypto(*mode);
        for size in FRAME_SIZES {
            let mut plaintext = vec![0u8; *size];
            fastrand::fill(&mut plaintext);

            #[allow(clippy::unwrap_used)]
            c.bench_function(&format!("encrypt {mode} (p: {size} bytes)"), |b| {
                b.iter(|| black_box(crypto.encrypt(black_box(&plaintext), &header).unwrap()));
            });
        }
    }

    for mode in modes {
        let mut crypto = crypto(*mode);
        for size in FRAME_SIZES {
            let mut plaintext = vec![0u8; *size];
            fastrand::fill(&mut plaintext);

            let sealed = crypto
                .encrypt(&plaintext, &header)
                .expect("should encrypt plaintext");
            let (ciphertext, tag) = sealed.body.split_at(sealed.body.len() - 16);

            #[allow(clippy::unwrap_used)]
            c.bench_function(&format!("decrypt {mode} (p: {size} bytes)"), |b| {
                b.iter(|| {
                    black_box(
                        crypto
                            .decrypt(black_box(ciphertext), tag, &header, &sealed.trailer)
                            .unwrap(),
                    )
                });
            });
        }
    }
}

criterion_group!(benches, seal_frames);
criterion_main!(benches);
