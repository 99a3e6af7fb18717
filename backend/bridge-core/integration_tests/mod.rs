mod bridge;
mod config;
mod discovery;
mod helpers;
mod key_store;
mod process;
