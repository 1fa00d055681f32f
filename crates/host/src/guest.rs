use crate::env::Env;
use geopattern_wasmer_common::wasm_error;
use geopattern_wasmer_common::GuestPtr;
use geopattern_wasmer_common::Len;
use geopattern_wasmer_common::WasmError;
use geopattern_wasmer_common::WasmErrorInner;
use wasmer::TypedFunction;

/// Host calling the guest export named `f` with `input`, receiving a string back.
///
/// The full sequence is:
/// encode utf-8 -> allocate an input region -> copy the bytes in -> invoke the export
/// with (scratch, ptr, len) -> read the returned (ptr, len) out of the scratch slot ->
/// copy and free the returned region -> decode.
///
/// The input region is owned by this call and is released on every exit path, including
/// when the guest traps, so a failed render never strands bytes in the guest allocator.
/// The returned region is released as soon as its bytes have been copied to the host.
pub fn call(env: &mut Env, f: &str, input: &str) -> Result<String, WasmError> {
    tracing::trace!(f, len = input.len(), "guest call");
    let bytes = input.as_bytes();
    let len: Len = bytes
        .len()
        .try_into()
        .map_err(|_| wasm_error!(WasmErrorInner::PointerMap))?;
    let input_ptr = env.allocate(len)?;

    let result = call_inner(env, f, input_ptr, len, bytes);
    // the input handle is released whether or not the call landed
    let released = env.deallocate(input_ptr, len);
    let output = result?;
    released?;
    Ok(output)
}

fn call_inner(
    env: &mut Env,
    f: &str,
    input_ptr: GuestPtr,
    len: Len,
    bytes: &[u8],
) -> Result<String, WasmError> {
    env.write_bytes(input_ptr, bytes)?;

    let render: TypedFunction<(GuestPtr, GuestPtr, Len), ()> = env
        .instance
        .exports
        .get_typed_function(&env.store, f)
        .map_err(|e| wasm_error!(WasmErrorInner::Export(e.to_string())))?;

    let scratch = env.scratch_ptr()?;
    render
        .call(env.store_mut(), scratch, input_ptr, len)
        .map_err(|e| wasm_error!(WasmErrorInner::Guest(e.to_string())))?;

    // the guest may have grown memory while building its result, so the scratch
    // record and the result bytes are both read through freshly checked views
    let output = env.read_return_slice(scratch)?;
    env.consume_string_from_guest(output)
}
