//! Multipart form collection for the image upload endpoints.

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::blob::Upload;
use crate::error::{AppError, AppResult};

/// Text fields by name plus any uploaded files by field name.
#[derive(Debug, Default)]
pub struct FormFields {
    pub text: HashMap<String, String>,
    pub files: HashMap<String, Upload>,
}

impl FormFields {
    pub async fn collect(mut multipart: Multipart) -> AppResult<Self> {
        let mut fields = FormFields::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(format!("malformed form: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(format!("malformed upload: {e}")))?;
                    // Browsers send an empty part when no file was picked.
                    if bytes.is_empty() && file_name.is_empty() {
                        continue;
                    }
                    fields.files.insert(
                        name,
                        Upload {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::validation(format!("malformed form: {e}")))?;
                    fields.text.insert(name, text);
                }
            }
        }
        Ok(fields)
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.text.remove(name)
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}
