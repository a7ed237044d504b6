//! Integration tests over a fully wired sync context

pub mod concurrency_test;
pub mod durability_test;
pub mod http_test;
pub mod ordering_test;
pub mod scenarios_test;
