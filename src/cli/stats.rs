use clap::Parser;

use crate::IMDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{ExtractorOptions, Opts};

#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {
    #[command(flatten)]
    pub extractor: ExtractorOptions,
}

impl SubCommandExtend for StatsCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = IMDBBuilder::new(opts.conf_dir.clone()).extractor(self.extractor.clone()).open().await?;
        let stats = db.stats().await?;
        db.store().close().await;

        println!("后端    : {}", stats.store.backend);
        println!("图片数量: {}", stats.store.count);
        println!("维度    : {}", stats.store.dimension);
        println!("距离度量: {}", stats.store.metric);
        println!("副本目录: {}", stats.storage_root.display());
        Ok(())
    }
}
