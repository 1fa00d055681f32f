pub mod result;
pub mod slice;

pub use result::*;
pub use slice::*;

/// something like usize for wasm
/// wasm has a memory limit of 4GB so offsets and lengths fit in u32
///
/// the host needs to directly read and write to the guest's memory so we need a predictable
/// number of bytes to represent offsets and lengths
/// we don't want to recompile the guest for different host `usize` widths, and u64
/// offsets/lengths would add no value inside a 32 bit address space
pub type WasmSize = u32;

/// a length in bytes inside guest linear memory, _not_ items
pub type Len = WasmSize;

/// an offset into guest linear memory, _never_ a host pointer
pub type GuestPtr = WasmSize;
