use crate::result::WasmError;
use crate::result::WasmErrorInner;
use crate::wasm_error;
use crate::GuestPtr;
use crate::Len;
use crate::WasmSize;

pub const WASM_SLICE_ITEMS: usize = 2;
pub const WASM_SLICE_BYTES: usize = std::mem::size_of::<WasmSize>() * WASM_SLICE_ITEMS;

/// WasmSlice is a 2 item WasmSize array of offset/length
/// exists so that the host can co-ordinate linear memory with the guest without over reliance
/// on compiler/allocation specific implementation details that could change over time
///
/// the offset always represents a position in wasm linear memory _never_ on the host
/// the length always represents u8 bytes _not_ items
///
/// the guest writes the two words of its return slice into a known scratch location and the
/// host reads them back out as this newtype, so both sides only ever agree on "two u32 words
/// at a known offset" rather than any richer structure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct WasmSlice([WasmSize; WASM_SLICE_ITEMS]);

impl WasmSlice {
    pub fn ptr(&self) -> GuestPtr {
        (self.0)[0]
    }

    pub fn len(&self) -> Len {
        (self.0)[1]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// wraps a naked array in a WasmSlice newtype for type safety
impl From<[WasmSize; WASM_SLICE_ITEMS]> for WasmSlice {
    fn from(array: [WasmSize; WASM_SLICE_ITEMS]) -> Self {
        Self(array)
    }
}

/// attempts to interpret exactly WASM_SLICE_BYTES of guest memory as a WasmSlice
///
/// wasm linear memory is always little endian so the words are decoded explicitly rather
/// than cast in place, which would also impose an alignment requirement the source bytes
/// cannot guarantee
impl std::convert::TryFrom<&[u8]> for WasmSlice {
    type Error = WasmError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != WASM_SLICE_BYTES {
            return Err(wasm_error!(WasmErrorInner::Memory));
        }
        let (ptr_bytes, len_bytes) = bytes.split_at(WASM_SLICE_BYTES / 2);
        Ok(Self([
            WasmSize::from_le_bytes(
                ptr_bytes
                    .try_into()
                    .map_err(|_| wasm_error!(WasmErrorInner::Memory))?,
            ),
            WasmSize::from_le_bytes(
                len_bytes
                    .try_into()
                    .map_err(|_| wasm_error!(WasmErrorInner::Memory))?,
            ),
        ]))
    }
}

#[cfg(test)]
pub mod tests {
    use super::WasmSlice;
    use super::WASM_SLICE_BYTES;

    #[test]
    fn wasm_slice_from_le_bytes_test() {
        let mut bytes = [0_u8; WASM_SLICE_BYTES];
        bytes[..4].copy_from_slice(&1048576_u32.to_le_bytes());
        bytes[4..].copy_from_slice(&11_u32.to_le_bytes());

        let slice = WasmSlice::try_from(&bytes[..]).unwrap();

        assert_eq!(slice.ptr(), 1048576);
        assert_eq!(slice.len(), 11);
        assert!(!slice.is_empty());
    }

    #[test]
    fn wasm_slice_wrong_len_test() {
        assert!(WasmSlice::try_from(&[0_u8; 7][..]).is_err());
        assert!(WasmSlice::try_from(&[0_u8; 9][..]).is_err());
    }

    #[test]
    fn wasm_slice_zero_len_test() {
        let slice = WasmSlice::from([64, 0]);
        assert!(slice.is_empty());
        assert_eq!(slice.ptr(), 64);
    }
}
