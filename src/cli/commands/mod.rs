mod init;
mod resolve;
mod search;

pub use init::cmd_init;
pub use resolve::cmd_resolve;
pub use search::cmd_search;
