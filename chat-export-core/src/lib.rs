#![doc = "chat-export-core: core pipeline library for chat-export."]

//! This crate contains the whole export pipeline: finding message-shaped
//! objects in a page snapshot, normalizing them, resolving artifacts and file
//! references, rendering HTML and Markdown, and assembling the ZIP archive.
//! Platform glue (argument parsing, config files, writing to disk) lives in
//! the `chat-export` binary crate.
//!
//! # Usage
//! Call [`export::export`] with a snapshot and implementations of the
//! collaborator traits in [`contract`].

pub mod archive;
pub mod config;
pub mod contract;
pub mod export;
pub mod fetch;
pub mod message;
pub mod mime;
pub mod normalize;
pub mod paths;
pub mod render;
pub mod resolve;
pub mod tree_search;
