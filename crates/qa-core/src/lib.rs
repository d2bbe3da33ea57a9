pub mod check;
pub mod collector;
pub mod config;
pub mod error;
pub mod io;
pub mod manager;
pub mod paths;
pub mod record;
pub mod seed;
pub mod snapshot;
pub mod status;
pub mod store;

pub use error::{QaError, Result};
