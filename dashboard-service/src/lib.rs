pub mod alerts;
pub mod api;
pub mod config;
pub mod directory;
pub mod export;
pub mod filter;
pub mod history;
pub mod metrics_server;
pub mod observability;

pub use alerts::{evaluate, AlertLevel, Evaluation};
pub use filter::{is_valid, MetricKind};
pub use history::{build_view, load_history, FetchMode, HistoryFilter, HistoryLoader, HistoryView};
