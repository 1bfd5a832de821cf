use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

static CONF_DIR: LazyLock<PathBuf> = LazyLock::new(|| match ProjectDirs::from("", "imvec", "imvec") {
    Some(dirs) => dirs.config_dir().to_path_buf(),
    None => PathBuf::from(".imvec"),
});

fn default_config_dir() -> ConfDir {
    ConfDir::new(CONF_DIR.as_path())
}

pub const DEFAULT_DIMENSION: usize = 512;
pub const DEFAULT_IMAGE_SIZE: u32 = 224;
pub const DEFAULT_MARGIN: u32 = 50;

#[derive(Parser, Debug, Clone)]
pub struct ExtractorOptions {
    /// 特征向量维度，超出自然特征长度的部分用零填充
    #[arg(long, value_name = "D", env = "IMVEC_DIMENSION", default_value_t = DEFAULT_DIMENSION, value_parser = parse_positive)]
    pub dimension: usize,
    /// 预处理后的标准图像边长
    #[arg(long, value_name = "SIZE", env = "IMVEC_IMAGE_SIZE", default_value_t = DEFAULT_IMAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    pub image_size: u32,
    /// 缩放时短边比标准尺寸多出的像素，便于中心裁剪
    #[arg(long, value_name = "PIXELS", env = "IMVEC_MARGIN", default_value_t = DEFAULT_MARGIN)]
    pub margin: u32,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self { dimension: DEFAULT_DIMENSION, image_size: DEFAULT_IMAGE_SIZE, margin: DEFAULT_MARGIN }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct PipelineOptions {
    /// 每个批次包含的文件数量
    #[arg(short, long, value_name = "SIZE", env = "IMVEC_BATCH_SIZE", default_value_t = 50, value_parser = parse_positive)]
    pub batch_size: usize,
    /// 并发工作任务数量
    #[arg(short, long, value_name = "N", env = "IMVEC_WORKERS", default_value_t = 4, value_parser = parse_positive)]
    pub workers: usize,
    /// 任务队列与结果队列的容量
    #[arg(long, value_name = "N", default_value_t = 100, value_parser = parse_positive)]
    pub channel_capacity: usize,
    /// 每处理多少个批次输出一次进度
    #[arg(long, value_name = "N", default_value_t = 10, value_parser = parse_positive)]
    pub report_every: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { batch_size: 50, workers: 4, channel_capacity: 100, report_every: 10 }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 返回的结果数量
    #[arg(short = 'k', long, value_name = "K", default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub top_k: u32,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imvec", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// imvec 配置文件目录
    #[arg(short, long, env = "IMVEC_CONF_DIR", default_value_t = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 批量添加目录中的图片
    Add(AddCommand),
    /// 从向量库中搜索相似图片
    Search(SearchCommand),
    /// 删除图片
    Delete(DeleteCommand),
    /// 显示向量库统计信息
    Stats(StatsCommand),
    /// 输出单张图片的特征向量
    Extract(ExtractCommand),
    /// 启动 HTTP 服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回向量数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("imvec.db")
    }

    /// 返回标准化图片副本的存储目录
    pub fn images(&self) -> PathBuf {
        self.path.join("images")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl std::fmt::Display for ConfDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("必须是正整数".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("无效的数字 {}: {}", s, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("3"), Ok(3));
        assert!(parse_positive("0").is_err());
        assert!(parse_positive("-1").is_err());
    }

    #[test]
    fn test_conf_dir_layout() {
        let dir = ConfDir::from_str("/tmp/imvec").unwrap();
        assert_eq!(dir.database(), PathBuf::from("/tmp/imvec/imvec.db"));
        assert_eq!(dir.images(), PathBuf::from("/tmp/imvec/images"));
    }

    #[test]
    fn test_pipeline_defaults() {
        let opts = PipelineOptions::parse_from(["add"]);
        assert_eq!(opts.batch_size, 50);
        assert_eq!(opts.workers, 4);
        assert_eq!(opts.channel_capacity, 100);
    }
}
