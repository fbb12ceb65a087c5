// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for chunk framing and response accumulation in the
// voxcomm-print crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use voxcomm_print::frame::{self, CHUNK_SIZE};
use voxcomm_print::response::ResponseBuffer;

/// Benchmark encoding a full frame (padding + CRC-32 + header).
fn bench_encode_frame(c: &mut Criterion) {
    let full = vec![0x47u8; CHUNK_SIZE];
    let short = vec![0x47u8; 808];

    c.bench_function("encode_frame (full chunk)", |b| {
        b.iter(|| black_box(frame::encode(black_box(7), black_box(&full))));
    });

    c.bench_function("encode_frame (short final chunk)", |b| {
        b.iter(|| black_box(frame::encode(black_box(2), black_box(&short))));
    });
}

/// Benchmark framing a 1 MiB file end to end.
fn bench_encode_file(c: &mut Criterion) {
    let data = vec![0x42u8; 1024 * 1024];

    c.bench_function("encode_file (1 MiB)", |b| {
        b.iter(|| {
            for chunk in frame::chunks(black_box(&data)) {
                black_box(chunk.encode());
            }
        });
    });
}

/// Benchmark accumulating a typical multi-line reply.
fn bench_response_accumulation(c: &mut Criterion) {
    let lines = [
        "CMD M28 Received.\r\n",
        "Writing to file: 0:/user/benchmark.gcode\r\n",
        "ok\r\n",
    ];

    c.bench_function("response_buffer (3-line reply)", |b| {
        b.iter(|| {
            let mut buf = ResponseBuffer::default();
            let mut done = None;
            for line in lines {
                done = buf.push(black_box(line));
            }
            black_box(done)
        });
    });
}

criterion_group!(
    benches,
    bench_encode_frame,
    bench_encode_file,
    bench_response_accumulation,
);
criterion_main!(benches);
