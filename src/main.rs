use clap::Parser;
use imvec::Opts;
use imvec::cli::SubCommandExtend;
use imvec::config::SubCommand;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Add(config) => config.run(&opts).await,
        SubCommand::Search(config) => config.run(&opts).await,
        SubCommand::Delete(config) => config.run(&opts).await,
        SubCommand::Stats(config) => config.run(&opts).await,
        SubCommand::Extract(config) => config.run(&opts).await,
        SubCommand::Server(config) => config.run(&opts).await,
    }
}
