pub mod app;
pub mod bruteforcer;
pub mod cli;
pub mod config;
pub mod connection;
pub mod logging;
pub mod output;
pub mod prober;
pub mod runner;
pub mod utils;

#[cfg(test)]
mod tests;
