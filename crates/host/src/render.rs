use crate::env::Env;
use crate::guest;
use geopattern_wasmer_common::WasmError;

/// Render the pattern for `input` as minified svg markup.
/// Deterministic and total over any input including the empty string.
pub fn generate_minified_svg_string(env: &mut Env, input: &str) -> Result<String, WasmError> {
    guest::call(env, "generate_minified_svg_string", input)
}

/// Render the pattern for `input` as base64 encoded svg, suitable for embedding
/// in a `data:image/svg+xml;base64,` uri.
pub fn generate_base64_svg_string(env: &mut Env, input: &str) -> Result<String, WasmError> {
    guest::call(env, "generate_base64_svg_string", input)
}
