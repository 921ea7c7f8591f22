use crate::models::QueryRecord;

/// Why a row was flagged by the diff engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviationKind {
    /// Not present in the baseline; delta is the query's own share
    Appeared,
    /// Present in both reports; delta is the change in share
    Shifted,
}

/// One flagged query of a pairwise comparison
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    /// Share in the new report
    pub fraction: f64,
    /// Signed change in share
    pub delta: f64,
    pub count: u64,
    pub schema: String,
    pub fingerprint: String,
    pub text: String,
    pub kind: DeviationKind,
}

impl DiffResult {
    pub fn appeared(record: &QueryRecord) -> Self {
        Self::from_record(record, record.fraction, DeviationKind::Appeared)
    }

    pub fn shifted(record: &QueryRecord, delta: f64) -> Self {
        Self::from_record(record, delta, DeviationKind::Shifted)
    }

    fn from_record(record: &QueryRecord, delta: f64, kind: DeviationKind) -> Self {
        Self {
            fraction: record.fraction,
            delta,
            count: record.count,
            schema: record.schema.clone(),
            fingerprint: record.fingerprint.clone(),
            text: record.text.clone(),
            kind,
        }
    }
}
