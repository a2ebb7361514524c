//! # RadAssist Web模块
//!
//! HTTP接口：影像上传分析、医生操作记录和健康检查。

pub mod error;
pub mod handlers;
pub mod intake;
pub mod server;

pub use error::ApiError;
pub use server::{create_app, AppState, WebServer};
