//! Integration tests driving the lending core over the in-memory backend,
//! plus ignored tests against PostgreSQL

mod common;
mod concurrency_tests;
mod lending_tests;
mod postgres_tests;
mod reader_tests;
