//! Device Native API Protocol
//!
//! This crate provides the wire codec and message types for the native API a
//! device exposes to its controller over TCP. It knows nothing about sockets
//! or entities; the server crate drives it.
//!
//! # Protocol Overview
//!
//! Each message is sent as a frame:
//!
//! ```text
//! [0x00][varint payload length][varint message type][payload]
//! ```
//!
//! The payload is a sequence of tagged fields in the protobuf wire format.
//! Fields holding their default value are never sent.
//!
//! - **Requests** (controller → device): handshake, subscriptions, commands
//! - **Responses** (device → controller): entity listings, states, log lines
//! - Ping and disconnect messages may travel either way.
//!
//! # Example
//!
//! ```rust
//! use devapi_proto::{encode_frame, FrameCodec, HelloRequest, Message, ProtoMessage, Request};
//!
//! let hello = HelloRequest { client_info: "controller".into() };
//! let frame = encode_frame(HelloRequest::MESSAGE_TYPE.id(), &hello.encode_to_vec());
//!
//! let mut codec = FrameCodec::new();
//! codec.push(&frame);
//! let header = codec.peek().unwrap().unwrap();
//! let message_type = devapi_proto::MessageType::try_from(header.message_type).unwrap();
//! let request = Request::decode(message_type, codec.payload(&header)).unwrap();
//! assert_eq!(request, Request::Hello(hello));
//! ```

mod basic;
mod codec;
mod commands;
mod constants;
mod entities;
mod error;
mod frame;
mod message;
mod message_type;
mod request;
mod services;
mod types;

pub use basic::*;
pub use codec::*;
pub use commands::*;
pub use constants::*;
pub use entities::*;
pub use error::*;
pub use frame::*;
pub use message::{encode_nested, Message, ProtoMessage};
pub use message_type::*;
pub use request::*;
pub use services::*;
pub use types::*;
