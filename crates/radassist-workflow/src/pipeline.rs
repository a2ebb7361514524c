//! 影像分析处理流程
//!
//! 顺序固定：紧急筛查 → 影像分析 → 报告落盘。
//! 分析失败会被替换为降级结果，保证每个非紧急请求都留下可审计的记录。

use chrono::Utc;
use radassist_core::{
    AnalysisResult, AuditEvent, PatientMetadata, ReportRecord, ReportSummary, Result,
    UploadedImage,
};
use radassist_integration::ImageAnalyzer;
use radassist_storage::{AuditLog, ReportStore};
use std::sync::Arc;
use tracing::{error, info};

use crate::screening::{EmergencyScreener, EMERGENCY_MESSAGE};

/// 返回给调用方的下一步提示
pub const NEXT_STEP_HINT: &str = "Draft only. A clinician must review this report and \
record approve/edit/reject via POST /clinician/approve before release.";

/// 流程结果
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// 命中紧急关键词，未执行分析
    Emergency { message: String, matched: String },
    /// 已生成初步报告
    Drafted(ReportSummary),
}

/// 分析流程
pub struct AnalysisPipeline {
    screener: EmergencyScreener,
    analyzer: Arc<dyn ImageAnalyzer>,
    reports: ReportStore,
    audit: Arc<AuditLog>,
}

impl AnalysisPipeline {
    pub fn new(
        analyzer: Arc<dyn ImageAnalyzer>,
        reports: ReportStore,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            screener: EmergencyScreener::new(),
            analyzer,
            reports,
            audit,
        }
    }

    pub fn with_screener(mut self, screener: EmergencyScreener) -> Self {
        self.screener = screener;
        self
    }

    /// 处理一个请求
    pub async fn run(
        &self,
        image: &UploadedImage,
        patient: PatientMetadata,
    ) -> Result<PipelineOutcome> {
        if let Some(matched) = self.screener.screen(patient.notes.as_deref()) {
            let matched = matched.to_string();
            self.audit
                .append(AuditEvent::LifeThreatDetected {
                    patient_name: patient.patient_name.clone(),
                    notes: patient.notes.clone(),
                    file: image.stored_name.clone(),
                })
                .await?;

            return Ok(PipelineOutcome::Emergency {
                message: EMERGENCY_MESSAGE.to_string(),
                matched,
            });
        }

        let analysis = self.analyze_or_degrade(image, &patient).await;
        let summary = self.persist_report(image, patient, analysis).await?;
        Ok(PipelineOutcome::Drafted(summary))
    }

    /// 执行分析；任何失败都转换为降级结果
    async fn analyze_or_degrade(
        &self,
        image: &UploadedImage,
        patient: &PatientMetadata,
    ) -> AnalysisResult {
        match self.analyzer.analyze(image, patient).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_analysis_failure() {
                    error!("Analysis provider failed for {}: {}", image.stored_name, e);
                } else {
                    error!("Analysis step failed for {}: {}", image.stored_name, e);
                }
                AnalysisResult::degraded(&e, self.analyzer.model_name())
            }
        }
    }

    /// 生成并持久化报告记录，追加 draft_ready 审计事件
    pub async fn persist_report(
        &self,
        image: &UploadedImage,
        patient: PatientMetadata,
        analysis: AnalysisResult,
    ) -> Result<ReportSummary> {
        let id = self.reports.allocate_id().await?;
        let record = ReportRecord {
            id: id.clone(),
            file: image.stored_name.clone(),
            created_at: Utc::now(),
            patient_meta: patient,
            analysis,
        };

        self.reports.persist(&record).await?;
        self.audit
            .append(AuditEvent::DraftReady {
                report_id: id.clone(),
                file: record.file.clone(),
                urgency: record.analysis.urgency.clone(),
                used_model: record.analysis.used_model.clone(),
                confidence: record.analysis.confidence,
            })
            .await?;

        info!(
            "Draft report {} ready (model {}, confidence {:.2})",
            id, record.analysis.used_model, record.analysis.confidence
        );

        let analysis = record.analysis;
        Ok(ReportSummary {
            report_id: id,
            findings: analysis.findings,
            differentials: analysis.differentials,
            urgency: analysis.urgency,
            draft_report: analysis.report,
            confidence: analysis.confidence,
            next: NEXT_STEP_HINT.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use radassist_core::{AssistError, DEGRADED_FINDING};
    use radassist_integration::MockAnalyzer;
    use radassist_storage::UploadStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// 统计调用次数的分析器
    #[derive(Default)]
    struct CountingAnalyzer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageAnalyzer for CountingAnalyzer {
        fn model_name(&self) -> &str {
            "counting"
        }

        async fn analyze(
            &self,
            _image: &UploadedImage,
            _patient: &PatientMetadata,
        ) -> Result<AnalysisResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResult::mock())
        }
    }

    /// 总是返回服务端错误的分析器
    struct FailingAnalyzer;

    #[async_trait]
    impl ImageAnalyzer for FailingAnalyzer {
        fn model_name(&self) -> &str {
            "vision-test"
        }

        async fn analyze(
            &self,
            _image: &UploadedImage,
            _patient: &PatientMetadata,
        ) -> Result<AnalysisResult> {
            Err(AssistError::RemoteAnalysis {
                status: 500,
                body: "upstream exploded".to_string(),
            })
        }
    }

    struct Fixture {
        _tmp: TempDir,
        reports: ReportStore,
        audit: Arc<AuditLog>,
        image: UploadedImage,
    }

    async fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let uploads = UploadStore::new(tmp.path().join("uploads"));
        let image = uploads
            .store("chest.png", Some("image/png".to_string()), b"png")
            .await
            .unwrap();

        Fixture {
            reports: ReportStore::new(tmp.path().join("reports")),
            audit: Arc::new(AuditLog::new(tmp.path().join("audit.log"))),
            image,
            _tmp: tmp,
        }
    }

    fn patient(notes: &str) -> PatientMetadata {
        PatientMetadata {
            patient_name: Some("Jane Roe".to_string()),
            age: Some("61".to_string()),
            sex: Some("F".to_string()),
            notes: Some(notes.to_string()),
        }
    }

    async fn report_files(reports: &ReportStore) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(mut dir) = tokio::fs::read_dir(reports.base_path()).await {
            while let Some(entry) = dir.next_entry().await.unwrap() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names
    }

    #[tokio::test]
    async fn test_emergency_short_circuits() {
        let fx = fixture().await;
        let analyzer = Arc::new(CountingAnalyzer::default());
        let pipeline =
            AnalysisPipeline::new(analyzer.clone(), fx.reports.clone(), fx.audit.clone());

        let outcome = pipeline
            .run(&fx.image, patient("Sudden onset CHEST PAIN radiating to arm"))
            .await
            .unwrap();

        match outcome {
            PipelineOutcome::Emergency { matched, message } => {
                assert_eq!(matched, "chest pain");
                assert_eq!(message, EMERGENCY_MESSAGE);
            }
            other => panic!("expected emergency, got {:?}", other),
        }
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
        assert!(report_files(&fx.reports).await.is_empty());

        let entries = fx.audit.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].event,
            AuditEvent::LifeThreatDetected {
                patient_name: Some("Jane Roe".to_string()),
                notes: Some("Sudden onset CHEST PAIN radiating to arm".to_string()),
                file: fx.image.stored_name.clone(),
            }
        );
    }

    #[tokio::test]
    async fn test_custom_screener_phrases() {
        let fx = fixture().await;
        let analyzer = Arc::new(CountingAnalyzer::default());
        let pipeline =
            AnalysisPipeline::new(analyzer.clone(), fx.reports.clone(), fx.audit.clone())
                .with_screener(EmergencyScreener::with_phrases(["Tension Pneumothorax"]));

        // 默认关键词不再生效
        let outcome = pipeline
            .run(&fx.image, patient("chest pain since morning"))
            .await
            .unwrap();
        assert!(matches!(outcome, PipelineOutcome::Drafted(_)));
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);

        let outcome = pipeline
            .run(&fx.image, patient("suspected tension pneumothorax on the left"))
            .await
            .unwrap();
        match outcome {
            PipelineOutcome::Emergency { matched, .. } => {
                assert_eq!(matched, "tension pneumothorax")
            }
            other => panic!("expected emergency, got {:?}", other),
        }
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report_files(&fx.reports).await.len(), 1);
    }

    #[tokio::test]
    async fn test_draft_is_persisted_and_audited() {
        let fx = fixture().await;
        let analyzer = Arc::new(CountingAnalyzer::default());
        let pipeline =
            AnalysisPipeline::new(analyzer.clone(), fx.reports.clone(), fx.audit.clone());

        let outcome = pipeline
            .run(&fx.image, patient("routine follow-up, mild cough"))
            .await
            .unwrap();
        let PipelineOutcome::Drafted(summary) = outcome else {
            panic!("expected a drafted report");
        };

        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.next, NEXT_STEP_HINT);
        assert_eq!(summary.confidence, 0.78);

        assert_eq!(
            report_files(&fx.reports).await,
            vec![format!("{}.json", summary.report_id)]
        );
        let record = fx.reports.load(&summary.report_id).await.unwrap();
        assert_eq!(record.id, summary.report_id);
        assert_eq!(record.file, fx.image.stored_name);
        assert_eq!(record.patient_meta, patient("routine follow-up, mild cough"));

        let entries = fx.audit.entries().await.unwrap();
        let drafts: Vec<_> = entries
            .iter()
            .filter(|e| e.event.kind() == "draft_ready")
            .collect();
        assert_eq!(drafts.len(), 1);
        match &drafts[0].event {
            AuditEvent::DraftReady { report_id, .. } => assert_eq!(report_id, &summary.report_id),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_failure_degrades() {
        let fx = fixture().await;
        let pipeline = AnalysisPipeline::new(
            Arc::new(FailingAnalyzer),
            fx.reports.clone(),
            fx.audit.clone(),
        );

        let outcome = pipeline.run(&fx.image, patient("")).await.unwrap();
        let PipelineOutcome::Drafted(summary) = outcome else {
            panic!("expected a drafted report");
        };

        assert_eq!(summary.findings, vec![DEGRADED_FINDING.to_string()]);
        assert_eq!(summary.confidence, 0.0);
        assert!(summary.draft_report.contains("upstream exploded"));

        let record = fx.reports.load(&summary.report_id).await.unwrap();
        assert_eq!(record.analysis.used_model, "vision-test");
        assert_eq!(fx.audit.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_summaries_match_across_patients() {
        let fx = fixture().await;
        let pipeline = AnalysisPipeline::new(
            Arc::new(MockAnalyzer::new()),
            fx.reports.clone(),
            fx.audit.clone(),
        );

        let a = pipeline.run(&fx.image, patient("knee")).await.unwrap();
        let b = pipeline
            .run(&fx.image, PatientMetadata::default())
            .await
            .unwrap();

        match (a, b) {
            (PipelineOutcome::Drafted(a), PipelineOutcome::Drafted(b)) => {
                assert_ne!(a.report_id, b.report_id);
                assert_eq!(a.findings, b.findings);
                assert_eq!(a.differentials, b.differentials);
                assert_eq!(a.urgency, b.urgency);
                assert_eq!(a.draft_report, b.draft_report);
                assert_eq!(a.confidence, b.confidence);
            }
            _ => panic!("expected two drafted reports"),
        }
    }
}
