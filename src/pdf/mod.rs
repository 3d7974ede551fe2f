//! PDF placeholder and byte-range engine: locating and embedding a
//! detached signature without perturbing any signed byte.

pub mod locator;
pub mod preparer;

pub use locator::{ByteRange, SignatureAreas};
pub use preparer::{PrepareConfig, PreparedPdf};
