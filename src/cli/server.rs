use anyhow::Context;
use clap::Parser;
use log::{error, info};
use prometheus::{BasicAuthentication, labels};
use rand::distr::{Alphanumeric, SampleString};
use tokio::net::TcpListener;
use tokio::task::spawn_blocking;
use tokio::time::{Duration, sleep};

use crate::cli::{SubCommandExtend, open_session};
use crate::{Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: String,
    /// 请求验证 token，不填则随机生成
    #[arg(long, default_value_t = String::new())]
    pub token: String,
    /// prometheus 主动推送地址
    #[arg(long, value_name = "URL")]
    pub prometheus_push: Option<String>,
    /// 自定义 instance 标签值
    #[arg(long, value_name = "NAME")]
    pub prometheus_instance: Option<String>,
    /// prometheus 认证信息，格式为 username:password
    #[arg(long, value_name = "AUTH")]
    pub prometheus_auth: Option<String>,
}

impl ServerCommand {
    fn basic_auth(&self) -> anyhow::Result<Option<(String, String)>> {
        self.prometheus_auth
            .as_deref()
            .map(|s| {
                let (username, password) =
                    s.split_once(':').context("prometheus 认证信息应为 username:password")?;
                Ok((username.to_string(), password.to_string()))
            })
            .transpose()
    }

    fn spawn_push(&self, url: String) -> anyhow::Result<()> {
        let instance = self.prometheus_instance.clone().unwrap_or_else(|| self.addr.clone());
        let auth = self.basic_auth()?;
        tokio::spawn(async move {
            loop {
                let metric_families = prometheus::gather();
                let url = url.clone();
                let instance = instance.clone();
                let auth = auth.clone();
                let r = spawn_blocking(move || {
                    prometheus::push_metrics(
                        "imlabel",
                        labels! {
                            "instance".to_string() => instance,
                        },
                        &url,
                        metric_families,
                        auth.map(|(username, password)| BasicAuthentication { username, password }),
                    )
                })
                .await;
                match r {
                    Ok(Err(e)) => error!("推送指标失败: {e}"),
                    Err(e) => error!("推送任务异常退出: {e}"),
                    Ok(Ok(())) => {}
                }
                sleep(Duration::from_secs(30)).await;
            }
        });
        Ok(())
    }
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let session = open_session(opts)?;
        session.persist()?;

        let token = match self.token.is_empty() {
            true => {
                let token = Alphanumeric.sample_string(&mut rand::rng(), 32);
                info!("鉴权 token: {}", token);
                token
            }
            false => self.token.clone(),
        };

        // 创建应用状态
        let state = server::AppState::new(session, token);

        // 创建应用
        let app = server::create_app(state);

        if let Some(url) = self.prometheus_push.clone() {
            self.spawn_push(url)?;
        }

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
