//! Helpers that know nothing about projects, hosts or scripts.

pub mod io;
pub mod shell;
pub mod template;
