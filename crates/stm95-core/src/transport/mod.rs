//! Transport abstraction
//!
//! The engine never touches hardware directly. It drives an injected
//! transport that can move raw bytes and control chip-select lines.
//!
//! Two forms are provided:
//! - [`Transport`], the trait backends implement
//! - [`Handle`], a context plus optional function slots, validated once into
//!   an [`FnTransport`]

mod handle;
mod traits;

pub use handle::{FnTransport, Handle, ReadFn, SelectFn, WriteFn};
pub use traits::Transport;
