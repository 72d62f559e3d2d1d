//! Built-in extension modules.
//!
//! Each module is a bundle of commands that an extension file can enable.

pub mod admin;
pub mod general;
pub mod help;
pub mod stats;

use crate::extensions::Catalog;
use crate::{Data, NovaError};

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, NovaError>;

/// Every module an extension file can name.
pub fn catalog() -> Catalog {
    Catalog::default()
        .with("admin", admin::list)
        .with("general", general::list)
        .with("help", help::list)
        .with("stats", stats::list)
}
