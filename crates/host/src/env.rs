use crate::memory::ViewCache;
use crate::module;
use geopattern_wasmer_common::wasm_error;
use geopattern_wasmer_common::GuestPtr;
use geopattern_wasmer_common::Len;
use geopattern_wasmer_common::WasmError;
use geopattern_wasmer_common::WasmErrorInner;
use geopattern_wasmer_common::WasmSlice;
use geopattern_wasmer_common::WASM_SLICE_BYTES;
use wasmer::imports;
use wasmer::Instance;
use wasmer::Memory;
use wasmer::Store;
use wasmer::TypedFunction;

/// The linear memory export every wasm-bindgen style module carries.
pub const MEMORY: &str = "memory";
/// Guest allocator entry point, takes a byte length and returns an offset.
pub const ALLOCATE: &str = "__wbindgen_malloc";
/// Guest deallocator, takes the offset and byte length of a previous allocation.
/// Calling this is the only way guest memory is ever released, there is no collector.
pub const DEALLOCATE: &str = "__wbindgen_free";
/// Returns the fixed scratch location the guest writes multi-value returns into.
pub const GLOBAL_ARGUMENT_PTR: &str = "__wbindgen_global_argument_ptr";

/// Everything the host needs to marshal strings in and out of one module instance.
///
/// Owns the store, so the borrow checker enforces the protocol's no-reentrancy rule:
/// every call takes `&mut Env` and the scratch return slot is consumed before the
/// call returns. A multithreaded embedder needs its own mutex around the whole Env.
pub struct Env {
    pub(crate) store: Store,
    pub(crate) instance: Instance,
    memory: Memory,
    allocate: TypedFunction<Len, GuestPtr>,
    deallocate: TypedFunction<(GuestPtr, Len), ()>,
    global_argument_ptr: TypedFunction<(), GuestPtr>,
    /// memoized scratch slot address, queried from the guest once on first use
    scratch: Option<GuestPtr>,
    pub(crate) views: ViewCache,
}

impl Env {
    /// Compile and instantiate `wasm` and wire up the exports the marshalling
    /// protocol relies on. The scratch slot address is left unqueried until the
    /// first call needs it.
    pub fn new(wasm: &[u8]) -> Result<Self, WasmError> {
        let mut store = Store::new(module::make_engine());
        let module = module::build_module(&store, wasm)?;
        let instance = Instance::new(&mut store, &module, &imports! {})
            .map_err(|e| wasm_error!(WasmErrorInner::Compile(e.to_string())))?;

        let memory = instance
            .exports
            .get_memory(MEMORY)
            .map_err(|e| wasm_error!(WasmErrorInner::Export(e.to_string())))?
            .clone();
        let allocate = instance
            .exports
            .get_typed_function(&store, ALLOCATE)
            .map_err(|e| wasm_error!(WasmErrorInner::Export(e.to_string())))?;
        let deallocate = instance
            .exports
            .get_typed_function(&store, DEALLOCATE)
            .map_err(|e| wasm_error!(WasmErrorInner::Export(e.to_string())))?;
        let global_argument_ptr = instance
            .exports
            .get_typed_function(&store, GLOBAL_ARGUMENT_PTR)
            .map_err(|e| wasm_error!(WasmErrorInner::Export(e.to_string())))?;

        Ok(Self {
            store,
            instance,
            memory,
            allocate,
            deallocate,
            global_argument_ptr,
            scratch: None,
            views: ViewCache::default(),
        })
    }

    pub(crate) fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Ask the guest allocator for `len` bytes.
    /// A zero length request is valid and returns a usable offset.
    pub fn allocate(&mut self, len: Len) -> Result<GuestPtr, WasmError> {
        let guest_ptr = self
            .allocate
            .call(&mut self.store, len)
            .map_err(|e| wasm_error!(WasmErrorInner::Host(e.to_string())))?;
        tracing::trace!(guest_ptr, len, "allocated guest bytes");
        Ok(guest_ptr)
    }

    /// Hand a region back to the guest allocator.
    /// Must be called exactly once for every allocation and every returned slice.
    pub fn deallocate(&mut self, guest_ptr: GuestPtr, len: Len) -> Result<(), WasmError> {
        self.deallocate
            .call(&mut self.store, guest_ptr, len)
            .map_err(|e| wasm_error!(WasmErrorInner::Host(e.to_string())))?;
        tracing::trace!(guest_ptr, len, "deallocated guest bytes");
        Ok(())
    }

    /// The scratch return slot address, queried from the guest on first use and
    /// memoized for the life of this instance.
    pub fn scratch_ptr(&mut self) -> Result<GuestPtr, WasmError> {
        match self.scratch {
            Some(scratch) => Ok(scratch),
            None => {
                let scratch = self
                    .global_argument_ptr
                    .call(&mut self.store)
                    .map_err(|e| wasm_error!(WasmErrorInner::Host(e.to_string())))?;
                self.scratch = Some(scratch);
                Ok(scratch)
            }
        }
    }

    /// Copy `bytes` into guest memory at `guest_ptr`.
    pub fn write_bytes(&mut self, guest_ptr: GuestPtr, bytes: &[u8]) -> Result<(), WasmError> {
        self.views
            .view(&self.memory, &self.store)
            .write(guest_ptr as u64, bytes)
            .map_err(|_| wasm_error!(WasmErrorInner::Memory))
    }

    /// Copy `len` bytes out of guest memory at `guest_ptr`.
    /// The returned vector is host owned and stays valid after the region is freed.
    pub fn read_bytes(&mut self, guest_ptr: GuestPtr, len: Len) -> Result<Vec<u8>, WasmError> {
        let mut bytes = vec![0_u8; len as usize];
        self.views
            .view(&self.memory, &self.store)
            .read(guest_ptr as u64, &mut bytes)
            .map_err(|_| wasm_error!(WasmErrorInner::Memory))?;
        Ok(bytes)
    }

    /// Read the two u32 words the guest wrote into the scratch slot.
    /// The slot is a single entry mailbox, not a queue: it is overwritten by every
    /// call and must be consumed before the next call into the module.
    pub fn read_return_slice(&mut self, scratch: GuestPtr) -> Result<WasmSlice, WasmError> {
        let mut record = [0_u8; WASM_SLICE_BYTES];
        self.views
            .view(&self.memory, &self.store)
            .read(scratch as u64, &mut record)
            .map_err(|_| wasm_error!(WasmErrorInner::Memory))?;
        WasmSlice::try_from(&record[..])
    }

    /// Take a returned slice out of the guest: copy the bytes, release the guest
    /// region, then utf-8 decode the host-side copy.
    pub fn consume_string_from_guest(&mut self, slice: WasmSlice) -> Result<String, WasmError> {
        let bytes = self.read_bytes(slice.ptr(), slice.len())?;
        self.deallocate(slice.ptr(), slice.len())?;
        match String::from_utf8(bytes) {
            Ok(string) => Ok(string),
            Err(e) => {
                tracing::error!(guest_ptr = slice.ptr(), len = slice.len(), "{}", e);
                Err(wasm_error!(WasmErrorInner::from(e)))
            }
        }
    }
}
