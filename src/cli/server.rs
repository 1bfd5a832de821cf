use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use crate::cli::SubCommandExtend;
use crate::config::{ExtractorOptions, SearchOptions};
use crate::{IMDBBuilder, Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub extractor: ExtractorOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 监听地址
    #[arg(long, env = "IMVEC_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: String,
    /// 上传大小限制，单位为字节
    #[arg(long, env = "IMVEC_MAX_FILE_SIZE", default_value_t = 10 * 1024 * 1024)]
    pub max_file_size: usize,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = IMDBBuilder::new(opts.conf_dir.clone()).extractor(self.extractor.clone()).open().await?;
        std::fs::create_dir_all(db.storage().root())?;

        // 创建应用状态
        let state = server::AppState::new(db, self);

        // 创建应用
        let app = server::create_app(state);

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
