pub mod config;
pub mod error;
pub mod form;
pub mod logging;
pub mod model;
pub mod mutation;
pub mod pagination;
pub mod preview;
pub mod remote;
pub mod search;
pub mod selection;
pub mod session;
pub mod ui;

pub use error::{Error, Result};
