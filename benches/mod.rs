use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    resequence_bench::bench_sequence_insert,
    resequence_bench::bench_stream_reorder,
    resequence_bench::bench_batch_flush
);
criterion_main!(benches);
