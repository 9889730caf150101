//! Chat transport: the `Messaging` trait and the Matrix adapter.

pub mod matrix;
pub mod traits;

pub use matrix::MatrixAdapter;
pub use traits::{InboundStream, Messaging};
