//! Shared key generation for storage backends.
//!
//! Key format: `{upload_dir}/{file_name}` where the upload directory is the
//! owning video's id.

use crate::{StorageError, StorageResult};

/// Generate the storage key of `file_name` inside `upload_dir`.
///
/// Neither part may be empty, contain a `/` or be a `..` component; the
/// directory is always the owning entity's id, so one entity can never
/// address another entity's files.
pub fn storage_key(upload_dir: &str, file_name: &str) -> StorageResult<String> {
    validate_segment(upload_dir)?;
    validate_segment(file_name)?;
    Ok(format!("{}/{}", upload_dir, file_name))
}

/// Split a key built by [`storage_key`] back into directory and file name.
pub fn split_key(key: &str) -> StorageResult<(&str, &str)> {
    let (upload_dir, file_name) = key
        .split_once('/')
        .ok_or_else(|| StorageError::InvalidKey(format!("Missing directory in {:?}", key)))?;
    validate_segment(upload_dir)?;
    validate_segment(file_name)?;
    Ok((upload_dir, file_name))
}

fn validate_segment(segment: &str) -> StorageResult<()> {
    if segment.is_empty()
        || segment.contains('/')
        || segment.contains('\\')
        || segment == "."
        || segment.contains("..")
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid key segment: {:?}",
            segment
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_directory_scoped_key() {
        assert_eq!(storage_key("1", "video.mp4").unwrap(), "1/video.mp4");
    }

    #[test]
    fn rejects_traversal_and_nesting() {
        assert!(storage_key("1", "../video.mp4").is_err());
        assert!(storage_key("1", "a/b.mp4").is_err());
        assert!(storage_key("", "video.mp4").is_err());
        assert!(storage_key("1", "").is_err());
    }

    #[test]
    fn splits_only_well_formed_keys() {
        assert_eq!(split_key("1/video.mp4").unwrap(), ("1", "video.mp4"));
        assert!(split_key("video.mp4").is_err());
        assert!(split_key("1/a/b.mp4").is_err());
        assert!(split_key("/etc/passwd").is_err());
        assert!(split_key("../../etc/passwd").is_err());
    }
}
