//! Integration tests for the shiftled signal loop.

mod common;

mod cancellation_test;
mod end_to_end_test;
