//! # RadAssist工作流模块
//!
//! 单个请求的处理流程：
//! - 紧急情况筛查：备注命中关键词时立即终止流程
//! - 影像分析：分析失败时降级，不中断流程
//! - 报告落盘：生成报告记录并写入审计日志
//! - 医生操作记录：仅写审计日志，不修改报告记录

pub mod clinician;
pub mod pipeline;
pub mod screening;

// 重新导出主要类型
pub use clinician::{ClinicianActionLogger, ClinicianActionRequest};
pub use pipeline::{AnalysisPipeline, PipelineOutcome, NEXT_STEP_HINT};
pub use screening::{EmergencyScreener, EMERGENCY_MESSAGE, EMERGENCY_PHRASES};
