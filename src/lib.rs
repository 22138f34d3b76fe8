//! Unattended multi-account battle automation for the MoltArena API.
//!
//! The crate is a single blocking pipeline: the scheduler walks the roster
//! once per cycle, each account runs one battle lifecycle (select agent,
//! start battle, poll to a terminal outcome), and every remote call goes
//! through a retrying executor over a pluggable transport. All waiting is
//! cooperative sleep through the `Sleeper` seam so tests run instantly.

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod roster;
pub mod scheduler;
pub mod transport;
