pub mod config;
pub mod parse;
pub mod reply;
pub mod run;

mod services;
