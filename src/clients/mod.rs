//! Client handles over the collection actors.

#[macro_use]
mod macros;

pub mod design_client;
pub mod order_client;

pub use design_client::*;
pub use order_client::*;
