pub mod analysis;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod legacy;
pub mod logger;
pub mod models;
pub mod normalize;
pub mod sheets;
pub mod store;

#[cfg(test)]
pub mod test_utils;
