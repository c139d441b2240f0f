// Snake-draft pick orchestration: order math, polling, runs and lifecycle.

pub mod manager;
pub mod model;
pub mod order;
pub mod poller;
pub mod run;
pub mod status;
