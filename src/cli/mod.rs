mod add;
mod delete;
mod extract;
mod search;
pub mod server;
mod stats;

pub use add::*;
pub use delete::*;
pub use extract::*;
pub use search::*;
pub use server::*;
pub use stats::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
