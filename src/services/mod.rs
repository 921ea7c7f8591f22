pub mod capture_service;
pub mod diff_engine;
pub mod filter_policy;
pub mod intersection_engine;
pub mod mysql_client;
pub mod report_codec;
pub mod sweep_service;

pub use capture_service::{CaptureOptions, CaptureService, StatementSource, render_capture};
pub use diff_engine::{DiffEngine, diff_summary, render_diff};
pub use filter_policy::{BUILTIN_DENYLIST, Denylist, FilterPolicy};
pub use intersection_engine::{
    DEFAULT_MIN_COUNT, IntersectionConfig, IntersectionEngine, IntersectionOutcome, LabeledReport,
    intersection_summary, render_intersection,
};
pub use mysql_client::MySQLClient;
pub use report_codec::{decode, encode, read_report, write_report};
pub use sweep_service::{
    Connector, SweepOptions, SweepService, default_report_dates, expand_dsn, read_host_map,
};
