//! Fleet daemon: HTTP front end over the deployment orchestrator

pub mod api;
pub mod config;
