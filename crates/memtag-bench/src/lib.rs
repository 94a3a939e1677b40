//! Benchmark-only crate; the interesting content is under `benches/`.
