pub mod benchmark_utils;
pub mod config;
pub mod disks;
pub mod engine;
pub mod error;
pub mod primes;
pub mod sweep;
pub mod throughput;
