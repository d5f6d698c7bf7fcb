// Public modules
pub mod collector;
pub mod config;
pub mod criteria;
pub mod dates;
pub mod defaults;
pub mod error;
pub mod grouping;
pub mod importance;
pub mod io;
pub mod models;
pub mod oracle;
pub mod pipeline;
pub mod policy;
pub mod press;
pub mod state;
pub mod triage;

mod lenient;

// Re-export commonly used types
pub use collector::{Collector, GoogleNewsCollector, JsonFileCollector};
pub use config::Config;
pub use error::{OracleError, ParseError};
pub use io::{get_default_runs_dir, list_runs, load_run, save_run, RunRecord};
pub use lenient::{extract_json, strip_code_blocks};
pub use models::{
    Diagnostic, DiagnosticKind, Group, Importance, Judged, NewsItem, NotSelected, OracleExchange,
    RawArticle, Rejection, Selected, Stage,
};
pub use oracle::{OpenAiOracle, Oracle};
pub use pipeline::Pipeline;
pub use policy::CurationPolicy;
pub use state::PipelineState;
