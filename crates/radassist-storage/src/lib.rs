//! # RadAssist存储模块
//!
//! 负责上传影像、初步报告记录和审计日志的本地落盘。
//! 所有写入都是新建或追加，不做原地修改。

pub mod audit;
pub mod reports;
pub mod storage;

pub use audit::AuditLog;
pub use reports::ReportStore;
pub use storage::UploadStore;
