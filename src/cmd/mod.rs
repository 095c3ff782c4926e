//! CLI command implementations.
//!
//! | Module   | Commands handled           |
//! |----------|----------------------------|
//! | `run`    | `Run`                      |
//! | `state`  | `State Show`, `State Reset`|
//! | `config` | `Config`                   |

pub mod config;
pub mod run;
pub mod state;

pub use config::cmd_config;
pub use run::{RunArgs, cmd_run};
pub use state::{cmd_state_reset, cmd_state_show};
