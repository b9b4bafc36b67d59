//! Core types for descriptor-driven unary RPC.
//!
//! This crate provides the pieces that carry no I/O and are shared between the
//! client runtime (`webrpc-client`) and service declarations:
//!
//! - [`error`]: Status codes and the [`Status`] carried by application errors
//! - [`codec`]: The per-message [`Codec`] contract and [`ProstCodec`]
//! - [`descriptor`]: [`MethodDescriptor`] and [`ServiceDescriptor`] tables
//! - [`frame`]: gRPC-Web length-prefixed framing and trailer parsing

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod frame;

pub use codec::*;
pub use descriptor::*;
pub use error::*;
pub use frame::*;
