use std::sync::Arc;

use tokio::sync::Mutex;

use super::error::Unauthorized;
use crate::session::Session;

/// 应用状态
///
/// 所有请求共用一个会话，锁保证同一时间只有一个写入者
pub struct AppState {
    /// 标注会话
    pub session: Mutex<Session>,
    /// 鉴权 token
    pub token: String,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(session: Session, token: String) -> Arc<Self> {
        Arc::new(AppState { session: Mutex::new(session), token })
    }

    pub fn authorize(&self, token: &str) -> Result<(), Unauthorized> {
        match token == self.token {
            true => Ok(()),
            false => Err(Unauthorized),
        }
    }
}
