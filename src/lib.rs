//! Code regions, symbols and includes for classic ASP / VBScript templates.
//!
//! The core is pure: it reads documents through a [`document::DocumentSource`]
//! and answers structural questions about them. Nothing here fails on
//! malformed source text; only host I/O and configuration surface as
//! [`Error`].

pub mod builder;
pub mod config;
pub mod docs;
pub mod document;
pub mod error;
pub mod grammar;
pub mod includes;
pub mod index;
pub mod query;
pub mod resolver;
pub mod scanner;
#[cfg(test)]
mod testing;
pub mod types;

pub use error::Error;
