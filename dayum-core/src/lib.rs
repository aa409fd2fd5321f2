#![doc = "dayum-core: core logic library for the Project Dayum front-end."]

//! This crate holds the renderer-independent logic of the site: the document store
//! contract, realtime story sync, the carousel engine behind the landing page and the
//! card deck, the reader controller and the canvas frame loop.
//! Rendering and the concrete store client live in the `dayum` crate.
//!
//! # Usage
//! Inject a [`contract::DocumentStore`] into [`stories::StorySync`] and build views from there.
//! [`memory::InMemoryStore`] is a complete store for tests and offline runs.

pub mod animation;
pub mod carousel;
pub mod config;
pub mod contract;
pub mod deck;
pub mod landing;
pub mod memory;
pub mod reader;
pub mod routes;
pub mod slug;
pub mod stories;
pub mod story;
