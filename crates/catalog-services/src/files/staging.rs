//! Pulls uploaded files out of a write request.
//!
//! After extraction every file slot in the attribute map holds a plain file
//! name, so the row can be persisted without knowing about uploads.

use catalog_core::models::{AttributeValue, Attributes, FileSlot, UploadedFile};

/// A file taken out of the attribute map, waiting to be stored.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub slot: FileSlot,
    pub file: UploadedFile,
}

impl StagedFile {
    /// Name the file is stored under inside the video's directory.
    pub fn name(&self) -> &str {
        self.file.hash_name()
    }
}

/// Replace every uploaded file in `slots` with its generated name.
///
/// Returns the extracted files in the order of `slots`. Slots that are
/// missing or already hold a name or null are left alone.
pub fn extract_files(attrs: &mut Attributes, slots: &[FileSlot]) -> Vec<StagedFile> {
    let mut staged = Vec::new();
    for slot in slots {
        let Some(value) = attrs.get_mut(slot.attribute_key()) else {
            continue;
        };
        if let AttributeValue::File(file) = value {
            let file = file.clone();
            *value = AttributeValue::Text(file.hash_name().to_string());
            staged.push(StagedFile { slot: *slot, file });
        }
    }
    staged
}
