//! 上传请求解析与校验

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartRejection};
use radassist_core::{AssistError, PatientMetadata};
use tracing::debug;

use crate::error::ApiError;

/// 影像字段名
pub const IMAGE_FIELD: &str = "image";

/// 缺少影像时的错误信息
pub const MISSING_IMAGE_MESSAGE: &str = "No image file uploaded. Use form field 'image'.";

/// 上传的影像文件
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// 解析后的上传表单
#[derive(Debug, Clone, Default)]
pub struct IntakeForm {
    pub image: Option<ImagePart>,
    pub metadata: PatientMetadata,
}

impl IntakeForm {
    /// 要求必须带有影像文件
    pub fn require_image(self) -> Result<(ImagePart, PatientMetadata), AssistError> {
        match self.image {
            Some(image) => Ok((image, self.metadata)),
            None => Err(AssistError::Validation(MISSING_IMAGE_MESSAGE.to_string())),
        }
    }
}

/// 读取multipart表单
///
/// 非multipart请求视为未上传影像；字段读取失败按框架给出的状态码返回。
pub async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<IntakeForm, ApiError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Not a multipart upload: {}", rejection);
            return Err(ApiError::BadRequest(MISSING_IMAGE_MESSAGE.to_string()));
        }
    };

    let mut form = IntakeForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(ApiError::Rejected(e.status(), e.body_text())),
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            IMAGE_FIELD => {
                // 只接受文件字段，且只取第一个
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;

                if form.image.is_none() && !bytes.is_empty() {
                    form.image = Some(ImagePart {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            "patientName" | "age" | "sex" | "notes" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;
                let slot = match name.as_str() {
                    "patientName" => &mut form.metadata.patient_name,
                    "age" => &mut form.metadata.age,
                    "sex" => &mut form.metadata.sex,
                    _ => &mut form.metadata.notes,
                };
                *slot = Some(value);
            }
            other => debug!("Ignoring form field {}", other),
        }
    }

    Ok(form)
}
