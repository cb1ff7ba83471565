pub mod commands;
pub mod doctor;
pub mod error;
pub mod fileset;
pub mod fs_utils;
pub mod host;
pub mod logging;
pub mod paths;
pub mod profiles;
pub mod registry;
pub mod switch;
pub mod sync;
pub mod toggles;
pub mod ui;

#[cfg(test)]
pub mod test_utils;

pub use error::{Error, Result};
