use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported document shape: expected an array of plants, an object with a `plants` array, or an object keyed by plant id (found {0})")]
    UnsupportedShape(&'static str),

    #[error("month map must be a JSON object of token -> month(s)")]
    MonthMapNotObject,

    #[error("month map has invalid entries: {}", .0.join("; "))]
    InvalidMonthMap(Vec<String>),
}
