use axum::extract::Multipart;

use crate::config::ConversionOptions;
use crate::pipeline::args;
use crate::upload::UploadedFile;

/// Parsed form fields from the multipart upload.
pub struct FormFields {
    pub file: UploadedFile,
    pub options: ConversionOptions,
}

/// Parse a multipart form upload into structured form fields.
///
/// Checkboxes are sent as a hidden `false` followed by the checkbox value when
/// ticked, so the last value for a field wins. Fields that are absent keep
/// the [`ConversionOptions`] defaults.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<FormFields, String> {
    let mut file: Option<UploadedFile> = None;
    let mut options = ConversionOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field.content_type().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read file data: {}", e))?
                    .to_vec();

                file = Some(UploadedFile::new(filename, mime_type, data));
            }
            "use_cli" => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read use_cli: {}", e))?;
                options.use_external_cli = parse_bool(&val);
            }
            "enable_plugins" => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read enable_plugins: {}", e))?;
                options.enable_plugins = parse_bool(&val);
            }
            "extra_args" => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read extra_args: {}", e))?;
                options.extra_arguments = args::tokenize(&val);
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    let file = file.ok_or("No file uploaded")?;

    Ok(FormFields { file, options })
}

fn parse_bool(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_values() {
        assert!(parse_bool("on"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" 1 "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }
}
