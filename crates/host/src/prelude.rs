pub use crate::env::Env;
pub use crate::guest;
pub use crate::memory::ViewCache;
pub use crate::module::build_module;
pub use crate::module::make_engine;
pub use crate::render::generate_base64_svg_string;
pub use crate::render::generate_minified_svg_string;
pub use geopattern_wasmer_common::wasm_error;
pub use geopattern_wasmer_common::*;
