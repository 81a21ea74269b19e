pub mod aggregate;
pub mod app;
pub mod config;
pub mod domain;
pub mod enrichr;
pub mod error;
pub mod fs_util;
pub mod invoker;
pub mod output;
pub mod select;
