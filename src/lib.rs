//! blogsmith application library
//!
//! Feature modules mounted by the binary. The only one today is
//! [`modules::generator`], which forwards blog post requests to a hosted
//! completion API.

pub mod modules;

pub use modules::register_all;
