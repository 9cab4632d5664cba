//! Benchmarks for the rollsink workspace live in `benches/`.
