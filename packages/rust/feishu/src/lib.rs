//! Client for the document platform's open API.
//!
//! This crate provides:
//! - [`FeishuClient`]: async HTTP client implementing every capability below
//! - [`TokenProvider`]: app credential → bearer token
//! - [`BlockConverter`]: markdown → flat block list
//! - [`DocumentPublisher`]: create a document, write blocks under its root
//! - [`Block`] and friends: the block model shared with the assembler

pub mod auth;
pub mod blocks;
pub mod client;
pub mod docx;

pub use auth::TokenProvider;
pub use blocks::{
    BLOCK_TYPE_CALLOUT, BLOCK_TYPE_TEXT, Block, CalloutStyle, ConvertedBlocks, DescendantPayload,
};
pub use client::{CODE_OK, FeishuClient};
pub use docx::{BlockConverter, DocumentPublisher};
