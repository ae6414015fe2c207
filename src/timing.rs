use std::hint::black_box;
use std::time::{Duration, Instant};

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::BenchError;
use crate::types::{Primitive, TimingResult};

/// Message used for one-shot probes when none is configured.
pub const DEFAULT_PROBE_MESSAGE: &[u8] = b"Hi this is plaintext";
pub const DEFAULT_CHUNK_BYTES: usize = 16 * 1024;
pub const DEFAULT_STREAM_SECS: f64 = 3.0;

/// A primitive that can be fed chunk after chunk and then finalized.
pub trait StreamOperation {
    fn step(&mut self, chunk: &mut [u8]) -> Result<(), BenchError>;

    /// Flush the primitive. The returned bytes (digest, last tag) keep the
    /// work observable so it cannot be optimized away.
    fn finish(self) -> Vec<u8>;
}

/// Timing figures plus whatever the measured operation produced.
#[derive(Debug, Clone)]
pub struct Measured<T = Vec<u8>> {
    pub timing: TimingResult,
    pub output: T,
}

/// Time context construction and a single run on `payload`.
///
/// Three monotonic readings are taken in sequence: before setup, after setup,
/// after the run. Throughput derived from a tiny payload is dominated by
/// clock resolution and must be reported as unreliable.
pub fn one_shot_probe<C, T>(
    setup: impl FnOnce() -> C,
    run: impl FnOnce(C, &[u8]) -> T,
    payload: &[u8],
) -> Measured<T> {
    let t0 = Instant::now();
    let ctx = setup();
    let t1 = Instant::now();
    let output = black_box(run(ctx, black_box(payload)));
    let t2 = Instant::now();

    let setup_latency_s = (t1 - t0).as_secs_f64();
    let op_latency_s = (t2 - t1).as_secs_f64();

    Measured {
        timing: TimingResult {
            setup_latency_s,
            op_latency_s,
            total_latency_s: (t2 - t0).as_secs_f64(),
            bytes_processed: payload.len() as u64,
            call_count: 1,
            elapsed_s: op_latency_s,
        },
        output,
    }
}

/// Feed `chunk` to `op` until `duration` has passed, then finalize.
///
/// The deadline is checked before each step, so `duration` is a minimum:
/// the run overshoots by at most one step. Finalization happens before the
/// last clock reading and is included in `elapsed_s`. A zero duration (or a
/// deadline already passed) yields `call_count == 0`. A duration too large
/// for the monotonic clock is rejected with [`BenchError::InvalidDuration`].
pub fn streaming_benchmark<O: StreamOperation>(
    mut op: O,
    chunk: &mut [u8],
    duration: Duration,
) -> Result<Measured, BenchError> {
    let mut bytes_processed: u64 = 0;
    let mut call_count: u64 = 0;

    let start = Instant::now();
    let deadline = start
        .checked_add(duration)
        .ok_or(BenchError::InvalidDuration {
            secs: duration.as_secs_f64(),
        })?;

    while Instant::now() < deadline {
        op.step(chunk)?;
        bytes_processed += chunk.len() as u64;
        call_count += 1;
    }

    let output = op.finish();
    let elapsed_s = start.elapsed().as_secs_f64();

    debug!(call_count, bytes_processed, elapsed_s, "streaming run finished");

    Ok(Measured {
        timing: TimingResult {
            setup_latency_s: 0.0,
            op_latency_s: elapsed_s,
            total_latency_s: elapsed_s,
            bytes_processed,
            call_count,
            elapsed_s,
        },
        output,
    })
}

/// Incremental SHA-256: one `update` per chunk.
pub struct Sha256Stream {
    hasher: Sha256,
}

impl Sha256Stream {
    pub fn new() -> Self {
        Sha256Stream {
            hasher: Sha256::new(),
        }
    }
}

impl Default for Sha256Stream {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamOperation for Sha256Stream {
    fn step(&mut self, chunk: &mut [u8]) -> Result<(), BenchError> {
        self.hasher.update(&*chunk);
        Ok(())
    }

    fn finish(self) -> Vec<u8> {
        self.hasher.finalize().to_vec()
    }
}

/// AES-GCM where every chunk is sealed in place as its own AEAD message.
///
/// The nonce is a 96-bit big-endian counter bumped after each chunk, so no
/// nonce repeats under one key within a run.
pub struct AesGcmStream<C> {
    cipher: C,
    nonce: [u8; 12],
    last_tag: Vec<u8>,
    label: &'static str,
}

impl<C> AesGcmStream<C>
where
    C: KeyInit + AeadInPlace<NonceSize = U12>,
{
    /// Build a stream under a fresh random key and nonce.
    pub fn random(label: &'static str) -> Result<Self, BenchError> {
        let mut rng = rand::thread_rng();
        let mut key = vec![0u8; C::key_size()];
        rng.fill_bytes(&mut key);
        let mut nonce = [0u8; 12];
        rng.fill_bytes(&mut nonce);

        let cipher = C::new_from_slice(&key).map_err(|e| BenchError::OperationFailed {
            primitive: label,
            detail: e.to_string(),
        })?;

        Ok(AesGcmStream {
            cipher,
            nonce,
            last_tag: Vec::new(),
            label,
        })
    }
}

impl<C> StreamOperation for AesGcmStream<C>
where
    C: AeadInPlace<NonceSize = U12>,
{
    fn step(&mut self, chunk: &mut [u8]) -> Result<(), BenchError> {
        let tag = self
            .cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&self.nonce), b"", chunk)
            .map_err(|e| BenchError::OperationFailed {
                primitive: self.label,
                detail: e.to_string(),
            })?;
        self.last_tag.clear();
        self.last_tag.extend_from_slice(&tag);
        increment_nonce_be(&mut self.nonce);
        Ok(())
    }

    fn finish(self) -> Vec<u8> {
        self.last_tag
    }
}

/// Treat the nonce as a big-endian counter and add one, wrapping at the top.
pub fn increment_nonce_be(nonce: &mut [u8; 12]) {
    for byte in nonce.iter_mut().rev() {
        let (next, carry) = byte.overflowing_add(1);
        *byte = next;
        if !carry {
            break;
        }
    }
}

/// One-shot probe of a built-in primitive on `payload`.
///
/// Key material is generated before the clock starts; setup covers only the
/// key schedule or hasher construction.
pub fn probe_primitive(primitive: Primitive, payload: &[u8]) -> Result<Measured, BenchError> {
    match primitive {
        Primitive::Sha256 => Ok(one_shot_probe(
            Sha256::new,
            |mut hasher, msg| {
                hasher.update(msg);
                hasher.finalize().to_vec()
            },
            payload,
        )),
        Primitive::Aes256Gcm => probe_aead::<Aes256Gcm>(primitive.label(), payload),
        Primitive::Aes128Gcm => probe_aead::<Aes128Gcm>(primitive.label(), payload),
    }
}

fn probe_aead<C>(label: &'static str, payload: &[u8]) -> Result<Measured, BenchError>
where
    C: KeyInit + Aead + AeadInPlace<NonceSize = U12>,
{
    let mut rng = rand::thread_rng();
    let mut key = vec![0u8; C::key_size()];
    rng.fill_bytes(&mut key);
    let mut nonce = [0u8; 12];
    rng.fill_bytes(&mut nonce);

    let measured = one_shot_probe(
        || C::new_from_slice(&key),
        |cipher, msg| match cipher {
            Ok(cipher) => cipher
                .encrypt(GenericArray::from_slice(&nonce), msg)
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        },
        payload,
    );

    let output = measured
        .output
        .map_err(|detail| BenchError::OperationFailed {
            primitive: label,
            detail,
        })?;

    Ok(Measured {
        timing: measured.timing,
        output,
    })
}

/// Streaming run of a built-in primitive over a zeroed chunk.
pub fn stream_primitive(
    primitive: Primitive,
    chunk_bytes: usize,
    duration: Duration,
) -> Result<Measured, BenchError> {
    let mut chunk = vec![0u8; chunk_bytes];
    match primitive {
        Primitive::Sha256 => streaming_benchmark(Sha256Stream::new(), &mut chunk, duration),
        Primitive::Aes256Gcm => streaming_benchmark(
            AesGcmStream::<Aes256Gcm>::random(primitive.label())?,
            &mut chunk,
            duration,
        ),
        Primitive::Aes128Gcm => streaming_benchmark(
            AesGcmStream::<Aes128Gcm>::random(primitive.label())?,
            &mut chunk,
            duration,
        ),
    }
}
