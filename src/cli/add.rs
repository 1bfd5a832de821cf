use std::path::PathBuf;

use clap::Parser;
use indicatif::ProgressBar;

use crate::IMDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{ExtractorOptions, Opts, PipelineOptions};
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub extractor: ExtractorOptions,
    #[command(flatten)]
    pub pipeline: PipelineOptions,
    /// 图片所在目录，会递归扫描 jpg、jpeg、png、bmp、tiff 文件
    pub path: PathBuf,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = IMDBBuilder::new(opts.conf_dir.clone()).extractor(self.extractor.clone()).open().await?;

        let pb = ProgressBar::no_length().with_style(pb_style());
        let stats = db.ingest_dir(&self.path, self.pipeline.clone(), pb.clone()).await?;
        pb.finish_with_message("图片添加完成");

        println!("成功: {}", stats.total_processed);
        println!("失败: {}", stats.total_errors);
        println!("批次: {} (失败 {})", stats.batches_seen, stats.batches_failed);

        db.store().close().await;
        Ok(())
    }
}
