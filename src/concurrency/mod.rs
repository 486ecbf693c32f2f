//! Concurrency & resource model (spec §5): bounded worker pool, memory
//! pressure monitoring, and scoped timeouts, all coordinated through the
//! Repository Analyzer.

pub mod memory;
pub mod pool;
pub mod timeout;
