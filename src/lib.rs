pub mod aggregate;
pub mod backend;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format_csv;
pub mod logging;
pub mod masking;
pub mod output;
pub mod run;
