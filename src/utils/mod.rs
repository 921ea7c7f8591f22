pub mod collection_ext;
pub mod error;
pub mod string_ext;
pub mod table;

pub use collection_ext::{keys_in_all, sum_by_key, unique_ordered};
pub use error::{CodecError, QrepError, QrepResult};
pub use string_ext::{StringExt, common_suffix, trim_common_suffix};
pub use table::TextTable;
