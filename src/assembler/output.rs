//! Output naming and writing
//!
//! Episodes are written only inside the configured output directory, under
//! a name that is either caller-chosen or derived from a fresh unique ID.
//! The file is encoded to a `.partial` sibling and renamed into place, so a
//! failed export never leaves a truncated episode behind.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::config::ExportFormat;
use crate::engine::{export_audio, AudioBuffer};
use crate::error::{PodmixError, Result};

/// How the output file should be named
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputName {
    /// `episode_<uuid>.<ext>` from a fresh v4 UUID
    #[default]
    Auto,
    /// `episode_<id>.<ext>`
    Episode(String),
    /// Exact file name chosen by the caller
    File(String),
}

impl OutputName {
    /// Resolve to a bare file name with the container's extension
    ///
    /// # Errors
    /// `InvalidOutputPath` if the name would escape the output directory.
    pub fn file_name(&self, format: &ExportFormat) -> Result<String> {
        let extension = format.container.extension();
        let name = match self {
            OutputName::Auto => format!("episode_{}.{}", Uuid::new_v4().simple(), extension),
            OutputName::Episode(id) => format!("episode_{id}.{extension}"),
            OutputName::File(name) => name.clone(),
        };
        validate_file_name(&name)?;
        Ok(name)
    }
}

/// The file an assembly produced
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// SHA-256 of the file contents, lowercase hex
    pub checksum: String,
}

/// Reject anything but a single plain path component
pub fn validate_file_name(name: &str) -> Result<()> {
    let invalid = matches!(name, "" | "." | "..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || Path::new(name).is_absolute();

    if invalid {
        return Err(PodmixError::InvalidOutputPath {
            path: name.to_string(),
        });
    }
    Ok(())
}

/// Encode `buffer` into `output_dir/file_name`
///
/// # Errors
/// `Encode` if the directory cannot be created or the export fails; the
/// partial file is removed before returning.
pub fn write_episode(
    buffer: &AudioBuffer,
    output_dir: &Path,
    file_name: &str,
    format: &ExportFormat,
) -> Result<WrittenFile> {
    validate_file_name(file_name)?;

    fs::create_dir_all(output_dir).map_err(|e| PodmixError::Encode {
        path: output_dir.to_path_buf(),
        reason: format!("cannot create output directory: {e}"),
    })?;

    let final_path = output_dir.join(file_name);
    let partial_path = output_dir.join(format!("{file_name}.partial"));

    let written = export_audio(buffer, &partial_path, format)
        .and_then(|_| {
            fs::rename(&partial_path, &final_path).map_err(|e| PodmixError::Encode {
                path: final_path.clone(),
                reason: format!("cannot move finished file into place: {e}"),
            })
        });

    if let Err(e) = written {
        discard(&partial_path);
        return Err(e);
    }

    let size_bytes = fs::metadata(&final_path)?.len();
    let checksum = calculate_checksum(&final_path)?;

    debug!(path = %final_path.display(), size_bytes, "episode written");

    Ok(WrittenFile {
        path: final_path,
        size_bytes,
        checksum,
    })
}

/// Calculate SHA-256 checksum of a file
pub fn calculate_checksum(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove partial output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generate_test_tone;
    use tempfile::tempdir;
    use test_case::test_case;

    #[test]
    fn test_auto_names_are_unique() {
        let format = ExportFormat::default();
        let a = OutputName::Auto.file_name(&format).unwrap();
        let b = OutputName::Auto.file_name(&format).unwrap();

        assert!(a.starts_with("episode_") && a.ends_with(".wav"));
        assert_eq!(a.len(), "episode_".len() + 32 + ".wav".len());
        assert_ne!(a, b);
    }

    #[test]
    fn test_episode_name() {
        let name = OutputName::Episode("42".to_string())
            .file_name(&ExportFormat::default())
            .unwrap();
        assert_eq!(name, "episode_42.wav");
    }

    #[test_case("../escape.wav" ; "parent traversal")]
    #[test_case(".." ; "parent directory")]
    #[test_case("nested/dir.wav" ; "separator")]
    #[test_case("/etc/passwd" ; "absolute")]
    #[test_case("" ; "empty")]
    fn test_rejects_unsafe_names(name: &str) {
        let err = OutputName::File(name.to_string())
            .file_name(&ExportFormat::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_OUTPUT_PATH");
    }

    #[test_case("ep..final.wav" ; "double dot inside name")]
    #[test_case("..hidden.wav" ; "leading double dot")]
    #[test_case("episode 12 (final).wav" ; "spaces and parens")]
    fn test_accepts_plain_names(name: &str) {
        assert!(validate_file_name(name).is_ok());
    }

    #[test]
    fn test_episode_id_cannot_escape() {
        let result = OutputName::Episode("../../x".to_string()).file_name(&ExportFormat::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_write_episode_reports_size_and_checksum() {
        let dir = tempdir().unwrap();
        let out_dir = dir.path().join("outputs");
        let tone = generate_test_tone(440.0, 0.5, 48000);

        let written = write_episode(&tone, &out_dir, "episode_1.wav", &ExportFormat::default()).unwrap();

        assert_eq!(written.path, out_dir.join("episode_1.wav"));
        // 44-byte header + 24000 16-bit mono samples
        assert_eq!(written.size_bytes, 44 + 24000 * 2);
        assert_eq!(written.checksum.len(), 64);
        assert_eq!(written.checksum, calculate_checksum(&written.path).unwrap());
        assert!(!out_dir.join("episode_1.wav.partial").exists());
    }

    #[test]
    fn test_failed_rename_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        // A non-empty directory where the episode should go blocks the rename
        let blocker = dir.path().join("episode_2.wav");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();
        let tone = generate_test_tone(440.0, 0.1, 48000);

        let err = write_episode(&tone, dir.path(), "episode_2.wav", &ExportFormat::default()).unwrap_err();
        assert_eq!(err.error_code(), "ENCODE_ERROR");
        assert!(!dir.path().join("episode_2.wav.partial").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_unusable_output_dir_is_encode_error() {
        let dir = tempdir().unwrap();
        let not_a_dir = dir.path().join("outputs");
        fs::write(&not_a_dir, b"file").unwrap();
        let tone = generate_test_tone(440.0, 0.1, 48000);

        let err = write_episode(&tone, &not_a_dir, "episode_3.wav", &ExportFormat::default()).unwrap_err();
        assert_eq!(err.error_code(), "ENCODE_ERROR");
    }
}
