//! # memchat core
//!
//! Shared, I/O-free logic for memchat: data models, the overlapping
//! chunker, the embedder trait, the vector index, the retriever, the
//! conversation state machine, command parsing and task records.
//!
//! This crate contains no tokio, sqlx, filesystem or network code.
//! Concrete embedders, completion clients and persistence live in the
//! `memchat` app crate.

pub mod chunk;
pub mod command;
pub mod conversation;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod persona;
pub mod retrieve;
pub mod tasks;

pub use error::{ChatError, Result};
