// Library for tests to access modules

pub mod compute_repo;
pub mod config;
pub mod models;
pub mod worker;
