pub mod channel;
pub mod cli;
pub mod config;
pub mod ingest;
pub mod op_logger;
pub mod spool;
