use geopattern_wasmer_common::wasm_error;
use geopattern_wasmer_common::WasmError;
use geopattern_wasmer_common::WasmErrorInner;
use std::sync::Arc;
use wasmer::sys::CompilerConfig;
use wasmer::wasmparser;
use wasmer::Cranelift;
use wasmer::Engine;
use wasmer::Module;
use wasmer::Store;
use wasmer_middlewares::Metering;

/// one hundred giga ops
///
/// a pattern render is linear in its input so this is far beyond anything a healthy
/// module will ever burn, it only exists to turn a runaway guest into an error
pub const WASM_METERING_LIMIT: u64 = 100_000_000_000;

/// Generate an engine with a wasm compiler
/// and Metering (use limits) in place.
pub fn make_engine() -> Engine {
    let cost_function = |_operator: &wasmparser::Operator| -> u64 { 1 };
    let metering = Arc::new(Metering::new(WASM_METERING_LIMIT, cost_function));

    let mut compiler = Cranelift::default();
    compiler.canonicalize_nans(true);
    compiler.push_middleware(metering);

    Engine::from(compiler)
}

/// Compile wasm bytes against a store built from [`make_engine`].
pub fn build_module(store: &Store, wasm: &[u8]) -> Result<Module, WasmError> {
    Module::new(store, wasm).map_err(|e| wasm_error!(WasmErrorInner::Compile(e.to_string())))
}

#[cfg(test)]
pub mod tests {
    use super::build_module;
    use super::make_engine;
    use wasmer::Store;

    #[test]
    fn build_module_test() {
        // simple example wasm taken from wasmer docs
        // https://docs.rs/wasmer/latest/wasmer/struct.Module.html#example
        let wasm: Vec<u8> = vec![
            0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0x01, 0x06, 0x01, 0x60, 0x01, 0x7f,
            0x01, 0x7f, 0x03, 0x02, 0x01, 0x00, 0x07, 0x0b, 0x01, 0x07, 0x61, 0x64, 0x64, 0x5f,
            0x6f, 0x6e, 0x65, 0x00, 0x00, 0x0a, 0x09, 0x01, 0x07, 0x00, 0x20, 0x00, 0x41, 0x01,
            0x6a, 0x0b, 0x00, 0x1a, 0x04, 0x6e, 0x61, 0x6d, 0x65, 0x01, 0x0a, 0x01, 0x00, 0x07,
            0x61, 0x64, 0x64, 0x5f, 0x6f, 0x6e, 0x65, 0x02, 0x07, 0x01, 0x00, 0x01, 0x00, 0x02,
            0x70, 0x30,
        ];
        let store = Store::new(make_engine());
        assert!(build_module(&store, &wasm).is_ok());
    }

    #[test]
    fn build_module_garbage_test() {
        let store = Store::new(make_engine());
        assert!(build_module(&store, b"not wasm at all").is_err());
    }
}
