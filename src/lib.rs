pub mod bot;
pub mod brain;
pub mod bus;
pub mod command;
pub mod config;
pub mod fs_util;
pub mod matcher;
pub mod reactor;
pub mod stem;
pub mod store;
pub mod term;
pub mod throttle;
pub mod types;
