use std::path::PathBuf;

use clap::Parser;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{ExtractorOptions, Opts};
use crate::features::{FeatureExtractor, SimpleExtractor};
use crate::utils::imread;

#[derive(Parser, Debug, Clone)]
pub struct ExtractCommand {
    #[command(flatten)]
    pub extractor: ExtractorOptions,
    /// 图片路径
    pub image: PathBuf,
}

impl SubCommandExtend for ExtractCommand {
    async fn run(&self, _opts: &Opts) -> anyhow::Result<()> {
        let extractor = SimpleExtractor::from(&self.extractor);
        let vector = block_in_place(|| -> anyhow::Result<_> {
            let image = imread(&self.image)?;
            Ok(extractor.extract(&image)?)
        })?;
        println!("{}", serde_json::to_string(&vector)?);
        Ok(())
    }
}
