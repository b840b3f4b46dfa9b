mod coverage;
mod matrix;
mod metadata;
mod ordering;
mod output;
mod run;
mod stats;
mod store;
mod winners;

pub use run::run;

pub(crate) use coverage::{
    CanonicalRunMatcher, build_coverage_rows, count_canonical_runs, summarize_mandatory,
};
pub(crate) use metadata::load_metadata;
pub(crate) use run::partition_resolved;
pub(crate) use store::{load_runs, open_store};
