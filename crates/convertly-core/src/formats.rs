//! Conversion-type table
//!
//! Resolves a requested target (`pdf`, `docx`, `pdf-to-word`, `ocr`) into the
//! output extension, remote operation and provider options for one job.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use utoipa::ToSchema;

use crate::error::AppError;

const JPG_QUALITY: u64 = 90;

/// Convert-task fields owned by the pipeline; callers cannot set them.
pub const RESERVED_OPTION_KEYS: &[&str] =
    &["operation", "input", "input_format", "output_format", "filename"];
const FALLBACK_BASENAME: &str = "converted";

/// Remote task operation driven for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConversionOperation {
    Convert,
    Optimize,
    /// Text extraction; the provider returns plain text that is re-served
    /// from the upload store.
    Ocr,
}

impl ConversionOperation {
    /// Operation name in the provider's task vocabulary.
    pub fn remote_operation(&self) -> &'static str {
        match self {
            ConversionOperation::Convert | ConversionOperation::Ocr => "convert",
            ConversionOperation::Optimize => "optimize",
        }
    }

    pub fn is_ocr(&self) -> bool {
        matches!(self, ConversionOperation::Ocr)
    }
}

struct TypeEntry {
    tag: &'static str,
    extension: &'static str,
    operation: ConversionOperation,
}

const CONVERSION_TYPES: &[TypeEntry] = &[
    TypeEntry { tag: "pdf-to-word", extension: "docx", operation: ConversionOperation::Convert },
    TypeEntry { tag: "word-to-pdf", extension: "pdf", operation: ConversionOperation::Convert },
    TypeEntry { tag: "pdf-to-excel", extension: "xlsx", operation: ConversionOperation::Convert },
    TypeEntry { tag: "excel-to-pdf", extension: "pdf", operation: ConversionOperation::Convert },
    TypeEntry { tag: "pdf-to-powerpoint", extension: "pptx", operation: ConversionOperation::Convert },
    TypeEntry { tag: "powerpoint-to-pdf", extension: "pdf", operation: ConversionOperation::Convert },
    TypeEntry { tag: "pdf-to-jpg", extension: "jpg", operation: ConversionOperation::Convert },
    TypeEntry { tag: "jpg-to-pdf", extension: "pdf", operation: ConversionOperation::Convert },
    TypeEntry { tag: "image-to-pdf", extension: "pdf", operation: ConversionOperation::Convert },
    TypeEntry { tag: "html-to-pdf", extension: "pdf", operation: ConversionOperation::Convert },
    TypeEntry { tag: "pdf-to-text", extension: "txt", operation: ConversionOperation::Convert },
    TypeEntry { tag: "compress-pdf", extension: "pdf", operation: ConversionOperation::Optimize },
    // Single-input for now; multi-file merge/split is not modelled.
    TypeEntry { tag: "merge-pdf", extension: "pdf", operation: ConversionOperation::Convert },
    TypeEntry { tag: "split-pdf", extension: "pdf", operation: ConversionOperation::Convert },
    TypeEntry { tag: "image-to-text", extension: "txt", operation: ConversionOperation::Ocr },
    TypeEntry { tag: "ocr", extension: "txt", operation: ConversionOperation::Ocr },
];

/// Everything the orchestrator needs to build a remote pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionPlan {
    pub conversion_type: Option<String>,
    pub output_format: String,
    pub operation: ConversionOperation,
    pub options: Map<String, Value>,
}

impl ConversionPlan {
    /// Resolve a target tag. User `overrides` win over table options.
    pub fn resolve(target: &str, overrides: Option<&Map<String, Value>>) -> Result<Self, AppError> {
        let tag = target.trim().to_lowercase();
        if tag.is_empty()
            || tag.starts_with('-')
            || tag.ends_with('-')
            || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(AppError::InvalidInput(format!(
                "Invalid target format: '{}'",
                target
            )));
        }

        let mut plan = match CONVERSION_TYPES.iter().find(|entry| entry.tag == tag) {
            Some(entry) => ConversionPlan {
                conversion_type: Some(tag.clone()),
                output_format: entry.extension.to_string(),
                operation: entry.operation,
                options: Map::new(),
            },
            // Unknown conversion types fall back to PDF output.
            None if tag.contains('-') => ConversionPlan {
                conversion_type: Some(tag.clone()),
                output_format: "pdf".to_string(),
                operation: ConversionOperation::Convert,
                options: Map::new(),
            },
            None => ConversionPlan {
                conversion_type: None,
                output_format: tag.clone(),
                operation: ConversionOperation::Convert,
                options: Map::new(),
            },
        };

        if let Some(key) = overrides
            .into_iter()
            .flat_map(|o| o.keys())
            .find(|key| RESERVED_OPTION_KEYS.contains(&key.as_str()))
        {
            return Err(AppError::InvalidInput(format!(
                "Option '{}' cannot be overridden",
                key
            )));
        }

        plan.apply_default_options();
        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                plan.options.insert(key.clone(), value.clone());
            }
        }

        Ok(plan)
    }

    fn apply_default_options(&mut self) {
        match self.operation {
            ConversionOperation::Optimize => {
                self.options.insert("profile".to_string(), json!("print"));
            }
            ConversionOperation::Ocr => {
                self.options.insert("ocr".to_string(), json!(true));
                self.options
                    .insert("ocr_languages".to_string(), json!(["eng"]));
            }
            ConversionOperation::Convert => {}
        }

        if matches!(self.output_format.as_str(), "jpg" | "jpeg") {
            self.options.insert("quality".to_string(), json!(JPG_QUALITY));
        }
    }
}

/// `<original-basename>.<extension>`, ignoring any directory part of the
/// client-supplied name.
pub fn derive_output_filename(original: &str, extension: &str) -> String {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();

    let base = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };

    let base = if base.is_empty() || base == "." {
        FALLBACK_BASENAME
    } else {
        base
    };

    format!("{}.{}", base, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_entry() {
        let plan = ConversionPlan::resolve("pdf-to-word", None).unwrap();
        assert_eq!(plan.output_format, "docx");
        assert_eq!(plan.conversion_type.as_deref(), Some("pdf-to-word"));
        assert_eq!(plan.operation, ConversionOperation::Convert);
        assert!(plan.options.is_empty());
    }

    #[test]
    fn test_bare_format() {
        let plan = ConversionPlan::resolve("PDF", None).unwrap();
        assert_eq!(plan.output_format, "pdf");
        assert!(plan.conversion_type.is_none());
    }

    #[test]
    fn test_unmapped_conversion_type_defaults_to_pdf() {
        let plan = ConversionPlan::resolve("epub-to-something", None).unwrap();
        assert_eq!(plan.output_format, "pdf");
        assert_eq!(plan.conversion_type.as_deref(), Some("epub-to-something"));
    }

    #[test]
    fn test_jpg_quality() {
        let plan = ConversionPlan::resolve("pdf-to-jpg", None).unwrap();
        assert_eq!(plan.output_format, "jpg");
        assert_eq!(plan.options["quality"], json!(90));

        let plan = ConversionPlan::resolve("jpeg", None).unwrap();
        assert_eq!(plan.options["quality"], json!(90));
    }

    #[test]
    fn test_compress_pdf_uses_optimize() {
        let plan = ConversionPlan::resolve("compress-pdf", None).unwrap();
        assert_eq!(plan.operation, ConversionOperation::Optimize);
        assert_eq!(plan.operation.remote_operation(), "optimize");
        assert_eq!(plan.options["profile"], json!("print"));
    }

    #[test]
    fn test_ocr_types() {
        for tag in ["ocr", "image-to-text"] {
            let plan = ConversionPlan::resolve(tag, None).unwrap();
            assert!(plan.operation.is_ocr());
            assert_eq!(plan.output_format, "txt");
            assert_eq!(plan.options["ocr"], json!(true));
        }
    }

    #[test]
    fn test_merge_and_split_have_no_special_options() {
        for tag in ["merge-pdf", "split-pdf"] {
            let plan = ConversionPlan::resolve(tag, None).unwrap();
            assert_eq!(plan.output_format, "pdf");
            assert!(plan.options.is_empty());
        }
    }

    #[test]
    fn test_user_options_override_defaults() {
        let mut overrides = Map::new();
        overrides.insert("quality".to_string(), json!(50));
        overrides.insert("pages".to_string(), json!("1-2"));
        let plan = ConversionPlan::resolve("jpg", Some(&overrides)).unwrap();
        assert_eq!(plan.options["quality"], json!(50));
        assert_eq!(plan.options["pages"], json!("1-2"));
    }

    #[test]
    fn test_rejects_pipeline_option_keys() {
        for key in RESERVED_OPTION_KEYS {
            let mut overrides = Map::new();
            overrides.insert(key.to_string(), json!("png"));
            let result = ConversionPlan::resolve("pdf", Some(&overrides));
            assert!(
                matches!(result, Err(AppError::InvalidInput(ref msg)) if msg.contains(key)),
                "accepted option {:?}",
                key
            );
        }
    }

    #[test]
    fn test_rejects_invalid_tags() {
        for tag in ["", "  ", "pdf/../x", "to pdf", "-pdf", "pdf-"] {
            assert!(
                ConversionPlan::resolve(tag, None).is_err(),
                "accepted {:?}",
                tag
            );
        }
    }

    #[test]
    fn test_derive_output_filename() {
        assert_eq!(derive_output_filename("report.txt", "pdf"), "report.pdf");
        assert_eq!(derive_output_filename("archive.tar.gz", "pdf"), "archive.tar.pdf");
        assert_eq!(derive_output_filename("README", "pdf"), "README.pdf");
        assert_eq!(derive_output_filename("../../etc/passwd.txt", "pdf"), "passwd.pdf");
        assert_eq!(derive_output_filename("C:\\docs\\memo.docx", "pdf"), "memo.pdf");
        assert_eq!(derive_output_filename(".env", "txt"), ".env.txt");
        assert_eq!(derive_output_filename("", "pdf"), "converted.pdf");
    }
}
