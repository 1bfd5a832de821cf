use clap::Parser;

use crate::IMDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{ExtractorOptions, Opts};

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    #[command(flatten)]
    pub extractor: ExtractorOptions,
    /// 图片 ID
    pub id: String,
}

impl SubCommandExtend for DeleteCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = IMDBBuilder::new(opts.conf_dir.clone()).extractor(self.extractor.clone()).open().await?;

        let existed = db.delete(&self.id).await?;
        db.store().close().await;

        if !existed {
            anyhow::bail!("图片不存在: {}", self.id);
        }
        println!("已删除: {}", self.id);
        Ok(())
    }
}
