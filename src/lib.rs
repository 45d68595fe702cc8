// lib.rs

pub mod config;
pub mod data;
pub mod decoder;
pub mod error;
pub mod markets;
pub mod math;
pub mod pda;
pub mod router;
pub mod rpc;

pub use data::{Quote, RouterResult, TokenPair};
pub use error::{Error, Result};
pub use router::Router;
