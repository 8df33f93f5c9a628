pub mod assemble;
pub mod coerce;
pub mod companion;
pub mod document;
pub mod error;
pub mod merge;
pub mod months;
pub mod normalize;
pub mod notifications;
pub mod pipeline;
pub mod rank;
pub mod record;
pub mod report;
pub mod vocab;
pub mod zones;

pub use assemble::{OutputDocument, OutputMetadata, format_timestamp, to_pretty_string};
pub use companion::ListOrder;
pub use document::{DocumentShape, SourceDocument};
pub use error::CoreError;
pub use months::{Month, MonthPolicy, MonthSet};
pub use normalize::{LegacyMonths, NormalizeOptions};
pub use pipeline::{DEFAULT_PRIMARY_FILE, MergeOptions, normalize_document, run_merge};
pub use record::PlantRecord;
pub use report::{Anomaly, AnomalyKind, RunReport};
