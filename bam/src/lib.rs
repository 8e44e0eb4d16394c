pub mod api;
pub mod cfg;
pub mod cmd;
pub mod engine;
pub mod flag;
pub mod headers;
pub mod logging;
pub mod pipeline;
pub mod source;
