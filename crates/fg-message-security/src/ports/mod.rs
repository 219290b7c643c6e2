//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that transports and applications call
//! - **Outbound (Driven)**: Key-file storage and time, supplied by adapters

pub mod inbound;
pub mod outbound;
