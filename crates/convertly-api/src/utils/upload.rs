//! Multipart helpers for the upload handler

use axum::extract::Multipart;
use convertly_core::AppError;

const FILE_FIELD: &str = "file";
const DEFAULT_FILENAME: &str = "upload";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Extract data, filename and content type from the multipart form.
/// Exactly one field named "file" is accepted; other fields are ignored.
pub async fn extract_multipart_file(
    mut multipart: Multipart,
) -> Result<(Vec<u8>, String, String), AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        if file_data.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        filename = field.file_name().map(sanitize_filename);
        content_type = field.content_type().map(|s| s.to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;
        file_data = Some(data.to_vec());
    }

    let file_data = file_data.ok_or_else(|| {
        AppError::InvalidInput("No file provided; send a field named 'file'".to_string())
    })?;

    let filename = filename
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    let content_type = content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    Ok((file_data, filename, content_type))
}

/// Keep the last path segment only; some clients send full local paths.
pub fn sanitize_filename(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim()
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.txt"), "report.txt");
        assert_eq!(sanitize_filename("C:\\Users\\me\\report.txt"), "report.txt");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("bad\"name\n.pdf"), "badname.pdf");
        assert_eq!(sanitize_filename("dir/"), "");
    }
}
