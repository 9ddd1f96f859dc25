//! Validation gate for files attached to a bug-fix request
//!
//! The conversation itself accepts any attachment; callers run files through
//! [`load`] or [`validate`] first and report failures with `set_error`.

use std::path::Path;

use thiserror::Error;

use crate::state::AttachedFile;

pub const DEFAULT_MAX_ATTACHMENT_CHARS: usize = 21_000;

/// Source, markup, config, doc, log and script extensions we accept
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    // code
    "rs", "py", "kt", "kts", "java", "scala", "groovy", "go", "c", "h", "cpp", "cc", "hpp",
    "cs", "swift", "m", "js", "jsx", "ts", "tsx", "mjs", "rb", "php", "lua", "dart", "r",
    "pl", "hs", "ex", "exs", "erl", "clj", "sql", "vue", "svelte",
    // markup
    "html", "htm", "xml", "css", "scss", "sass", "less",
    // config
    "json", "yaml", "yml", "toml", "ini", "cfg", "conf", "properties", "gradle", "env",
    // docs
    "txt", "md", "rst", "adoc", "csv",
    // logs
    "log",
    // scripts
    "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd", "mk", "cmake",
];

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Unsupported file type: {name}. Attach a source or text file.")]
    UnsupportedExtension { name: String },

    #[error("File {name} is too large ({chars} characters). Maximum: {max} characters.")]
    TooLarge { name: String, chars: usize, max: usize },

    #[error("File {name} is empty.")]
    Blank { name: String },

    #[error("Could not read {name}: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    pub allowed_extensions: Vec<String>,
    pub max_chars: usize,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_chars: DEFAULT_MAX_ATTACHMENT_CHARS,
        }
    }
}

impl AttachmentPolicy {
    pub fn with_max_chars(max_chars: usize) -> Self {
        Self {
            max_chars,
            ..Self::default()
        }
    }

    pub fn allows_name(&self, name: &str) -> bool {
        extension_of(name)
            .map(|ext| self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false)
    }
}

/// Check a picked file against the policy.
pub fn validate(
    name: &str,
    content: String,
    policy: &AttachmentPolicy,
) -> Result<AttachedFile, AttachmentError> {
    if !policy.allows_name(name) {
        return Err(AttachmentError::UnsupportedExtension {
            name: name.to_string(),
        });
    }

    let chars = content.chars().count();
    if chars > policy.max_chars {
        return Err(AttachmentError::TooLarge {
            name: name.to_string(),
            chars,
            max: policy.max_chars,
        });
    }

    if content.trim().is_empty() {
        return Err(AttachmentError::Blank {
            name: name.to_string(),
        });
    }

    Ok(AttachedFile::new(name, content))
}

/// Read `path` from disk and validate it.
pub fn load(path: &Path, policy: &AttachmentPolicy) -> Result<AttachedFile, AttachmentError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown_file".to_string());

    // Reject by extension before touching the file
    if !policy.allows_name(&name) {
        return Err(AttachmentError::UnsupportedExtension { name });
    }

    let content = std::fs::read_to_string(path).map_err(|source| AttachmentError::Unreadable {
        name: name.clone(),
        source,
    })?;

    validate(&name, content, policy)
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_accepts_source_file() {
        let file = validate("main.PY", "print(1)".to_string(), &AttachmentPolicy::default()).unwrap();
        assert_eq!(file.name, "main.PY");
        assert_eq!(file.content, "print(1)");
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let err = validate("photo.png", "x".to_string(), &AttachmentPolicy::default()).unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedExtension { .. }));

        let err = validate("Makefile", "all:".to_string(), &AttachmentPolicy::default()).unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedExtension { .. }));
    }

    #[test]
    fn test_limit_is_inclusive() {
        let policy = AttachmentPolicy::default();
        assert!(validate("a.txt", "a".repeat(21_000), &policy).is_ok());

        let err = validate("a.txt", "a".repeat(21_001), &policy).unwrap_err();
        match err {
            AttachmentError::TooLarge { chars, max, .. } => {
                assert_eq!(chars, 21_001);
                assert_eq!(max, 21_000);
            }
            other => panic!("expected TooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_blank_content() {
        let err = validate("a.rs", " \n\t ".to_string(), &AttachmentPolicy::default()).unwrap_err();
        assert!(matches!(err, AttachmentError::Blank { .. }));
    }

    #[test]
    fn test_load_reads_file_name_and_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bug.kt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "fun main() = println(1 / 0)").unwrap();

        let file = load(&path, &AttachmentPolicy::default()).unwrap();
        assert_eq!(file.name, "bug.kt");
        assert!(file.content.contains("println"));
    }

    #[test]
    fn test_load_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("gone.rs"), &AttachmentPolicy::default()).unwrap_err();
        assert!(matches!(err, AttachmentError::Unreadable { .. }));
    }
}
