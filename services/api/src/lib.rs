//! services/api/src/lib.rs
//!
//! The scripture content service: PostgreSQL and Redis adapters, the REST and
//! gRPC transports, and their shared configuration and error types.

pub mod adapters;
pub mod config;
pub mod error;
pub mod grpc;
pub mod web;
