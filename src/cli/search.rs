use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio::task::block_in_place;

use crate::IMDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{ExtractorOptions, Opts, SearchOptions};
use crate::imdb::SearchMatch;
use crate::utils::imread;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub extractor: ExtractorOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 被搜索的图片路径
    pub image: PathBuf,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let image = block_in_place(|| imread(&self.image))?;

        let db = IMDBBuilder::new(opts.conf_dir.clone()).extractor(self.extractor.clone()).open().await?;
        let result = db.search_image(image, self.search.top_k as usize).await?;
        db.store().close().await;

        print_result(&result, self)
    }
}

fn print_result(result: &[SearchMatch], opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for m in result {
                let path = m.stored_path.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
                println!("{}\t{:.4}\t{}\t{}", m.similarity, m.distance, m.id, path);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}
