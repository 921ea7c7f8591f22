pub mod diff;
pub mod intersection;
pub mod query_record;

pub use diff::*;
pub use intersection::*;
pub use query_record::*;
