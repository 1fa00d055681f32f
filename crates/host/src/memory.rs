use wasmer::AsStoreRef;
use wasmer::Memory;
use wasmer::MemoryView;

/// The identity of the guest's linear memory as observed through a view.
/// Growing the memory changes at least the size and usually also relocates the base,
/// so either changing means every previously derived view is stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ViewIdentity {
    base: usize,
    size: u64,
}

impl ViewIdentity {
    fn of(view: &MemoryView) -> Self {
        Self {
            base: view.data_ptr() as usize,
            size: view.data_size(),
        }
    }
}

/// Tracks the identity of guest linear memory between accesses.
///
/// The guest's allocator can grow memory during any call into the module, which
/// invalidates every view derived before the grow. All reads and writes therefore go
/// through [`ViewCache::view`], which re-derives a view from the live memory and checks
/// its identity against the last one observed. A view is never held across a guest
/// invocation.
#[derive(Default)]
pub struct ViewCache {
    identity: Option<ViewIdentity>,
    invalidations: u64,
}

impl ViewCache {
    /// A view over the guest memory as it is right now.
    /// Performs the identity check on every access so stale reads cannot happen.
    pub fn view<'a>(&mut self, memory: &Memory, store: &'a impl AsStoreRef) -> MemoryView<'a> {
        let view = memory.view(store);
        let identity = ViewIdentity::of(&view);
        if self.identity != Some(identity) {
            tracing::trace!(
                base = identity.base,
                size = identity.size,
                "wasm memory identity changed, dropping cached views"
            );
            self.identity = Some(identity);
            self.invalidations += 1;
        }
        view
    }

    /// How many times the backing buffer identity has changed, counting first use.
    pub fn invalidations(&self) -> u64 {
        self.invalidations
    }
}

#[cfg(test)]
pub mod tests {
    use super::ViewCache;
    use crate::module::make_engine;
    use wasmer::Memory;
    use wasmer::MemoryType;
    use wasmer::Pages;
    use wasmer::Store;

    #[test]
    fn view_cache_invalidates_on_grow_test() {
        let mut store = Store::new(make_engine());
        let memory = Memory::new(&mut store, MemoryType::new(Pages(1), None, false)).unwrap();
        let mut views = ViewCache::default();

        views.view(&memory, &store);
        assert_eq!(views.invalidations(), 1);

        // same buffer, no invalidation
        views.view(&memory, &store);
        views.view(&memory, &store);
        assert_eq!(views.invalidations(), 1);

        memory.grow(&mut store, Pages(1)).unwrap();

        views.view(&memory, &store);
        assert_eq!(views.invalidations(), 2);
    }
}
