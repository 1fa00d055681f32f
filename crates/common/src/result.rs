use serde::Deserialize;
use serde::Serialize;

/// Wraps a WasmErrorInner with the file and line number where it was raised.
/// The easiest way to build one is the `wasm_error!` macro which inserts the
/// correct file/line and can build strings by forwarding args to `format!`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WasmError {
    pub file: String,
    pub line: u32,
    pub error: WasmErrorInner,
}

impl std::fmt::Display for WasmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}:{}", self.error, self.file, self.line)
    }
}

impl std::error::Error for WasmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Everything that can go wrong while marshalling strings across the guest boundary.
/// All of these are fatal for the current call, none are retried.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, thiserror::Error,
)]
#[rustfmt::skip]
pub enum WasmErrorInner {
    /// the wasm failed to compile or instantiate
    #[error("failed to compile or instantiate wasm: {0}")]
    Compile(String),
    /// the module does not expose an export we rely on, or it has the wrong signature
    #[error("missing or mistyped wasm export: {0}")]
    Export(String),
    /// something went wrong while reading or writing bytes to/from wasm linear memory
    /// e.g. a slice record that doesn't decode to two u32 words, or an out of bounds access
    /// whatever this is it is very bad and probably not recoverable
    #[error("failed to read or write wasm memory")]
    Memory,
    /// while converting pointers and lengths between usize and u32 across the host/guest
    /// boundary we hit a number that cannot fit in u32
    /// wasm linear memory tops out at 4GB so this is indicative of a critical bug somewhere
    #[error("pointer or length out of range for wasm")]
    PointerMap,
    /// while shuffling raw bytes back into utf-8 we hit an invalid sequence
    /// the guest promises to only ever return utf-8 so this means a misbehaving module
    #[error("invalid utf-8 from guest: {0}")]
    Utf8(String),
    /// an allocator call on the guest failed from the host side
    #[error("host-side guest call failed: {0}")]
    Host(String),
    /// the render call itself trapped, aborted or ran out of metering budget
    #[error("guest call failed: {0}")]
    Guest(String),
}

impl From<std::num::TryFromIntError> for WasmErrorInner {
    fn from(_: std::num::TryFromIntError) -> Self {
        Self::PointerMap
    }
}

impl From<std::string::FromUtf8Error> for WasmErrorInner {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::Utf8(e.to_string())
    }
}

impl From<String> for WasmErrorInner {
    fn from(s: String) -> Self {
        Self::Guest(s)
    }
}

#[macro_export]
macro_rules! wasm_error {
    ($e:expr) => {
        $crate::WasmError {
            // On Windows the `file!()` macro returns a path with inconsistent separators:
            // from the workspace to the package root it uses backwards-slashes,
            // then within the package it uses forwards-slashes.
            // To remedy this we normalize the formatting here.
            file: file!().replace('\\', "/").to_string(),
            line: line!(),
            error: $e.into(),
        }
    };
    ($($arg:tt)*) => {{
        $crate::wasm_error!(std::format!($($arg)*))
    }};
}

#[cfg(test)]
pub mod tests {
    use crate::WasmError;
    use crate::WasmErrorInner;

    #[test]
    fn wasm_error_macro_captures_location_test() {
        let err = wasm_error!(WasmErrorInner::Memory);

        assert_eq!(err.error, WasmErrorInner::Memory);
        assert!(err.file.ends_with("result.rs"));
        assert!(err.line > 0);
    }

    #[test]
    fn wasm_error_macro_format_test() {
        let err = wasm_error!("not {} good", "very");

        assert_eq!(err.error, WasmErrorInner::Guest("not very good".into()));
    }

    #[test]
    fn wasm_error_display_test() {
        let err = WasmError {
            file: "foo.rs".into(),
            line: 7,
            error: WasmErrorInner::PointerMap,
        };

        assert_eq!(
            err.to_string(),
            "pointer or length out of range for wasm at foo.rs:7",
        );
    }

    #[test]
    fn wasm_error_int_conversion_test() {
        let too_big: Result<u32, _> = u64::MAX.try_into();
        let inner: WasmErrorInner = too_big.unwrap_err().into();
        assert_eq!(inner, WasmErrorInner::PointerMap);
    }
}
