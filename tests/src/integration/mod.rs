//! # Integration Tests
//!
//! Real files, real keys, real clock: each test lays out key directories in a
//! temporary directory and drives `MessageCodec` instances through
//! `FileKeyStore` and `SystemClock`.

#[cfg(test)]
mod fixtures;
mod key_learning;
mod request_reply;
