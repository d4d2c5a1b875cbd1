//! Integration tests for the encpipe library.
//!
//! These tests exercise end-to-end pipeline runs spanning all five stages,
//! the reset protocol under load, and queue correctness properties.

mod helpers;
mod test_pipeline_concurrency;
mod test_queue_properties;
