//! Wikipedia flat providers
//!
//! Two heuristic strategies sharing one client: infobox fields and
//! pattern rules over the article introduction.

pub mod client;
pub mod infobox;
pub mod search;

pub use client::WikipediaClient;
pub use infobox::InfoboxProvider;
pub use search::TextSearchProvider;
