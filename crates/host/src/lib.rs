pub mod env;
pub mod guest;
pub mod memory;
pub mod module;
pub mod prelude;
pub mod render;
