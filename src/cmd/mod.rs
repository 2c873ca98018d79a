//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `serve`  | `Serve`          |
//! | `table`  | `CreateTable`    |
//! | `config` | `Config`         |

pub mod config;
pub mod serve;
pub mod table;

pub use config::cmd_config;
pub use serve::cmd_serve;
pub use table::cmd_create_table;
