use crate::cli::{Cli, render};
use crate::config::{Config, Secrets};
use crate::startup::Application;
use crate::utils::logger::init_logger;
use anyhow::Context;
use clap::Parser;

mod cli;
mod config;
mod database;
mod errors;

mod infrastructure;
mod models;
mod repositories;
mod services;
mod startup;
#[cfg(test)]
mod testing;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志（全局只需调用一次）
    init_logger();
    log_info!("Starting application initialization...");

    // 1. 加载配置，私钥单独从环境读取
    let config = Config::load().context("Failed to load application configuration")?;
    let secrets = Secrets::from_env();

    // 2. 构建应用实例 (连接池、RPC、签名身份)
    let application = Application::build(config, secrets)
        .await
        .context("Application building failed (DB/RPC initialization)")?;

    // 3. 执行命令，结果写到 stdout，日志在 stderr
    let rendered = render(application.run(cli.command).await);
    println!("{}", rendered.text);
    if rendered.exit_code != 0 {
        std::process::exit(rendered.exit_code);
    }
    Ok(())
}
