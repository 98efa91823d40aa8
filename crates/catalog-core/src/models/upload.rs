use bytes::Bytes;
use std::path::Path;
use uuid::Uuid;

/// An uploaded file waiting to be stored.
///
/// The handle is independent of the transport that produced it. Its
/// `hash_name` is generated once, when the handle is built, and is the name
/// under which the file is persisted in a video's file slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    original_name: String,
    content_type: String,
    data: Bytes,
    hash_name: String,
}

impl UploadedFile {
    pub fn new(
        original_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let original_name = original_name.into();
        let content_type = content_type.into().to_lowercase();
        let stem = Uuid::new_v4().simple().to_string();
        let hash_name = match extension_for(&original_name, &content_type) {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem,
        };

        Self {
            original_name,
            content_type,
            data: data.into(),
            hash_name,
        }
    }

    /// Stable, unique file name used for storage.
    pub fn hash_name(&self) -> &str {
        &self.hash_name
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

fn extension_for(original_name: &str, content_type: &str) -> Option<String> {
    let from_name = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_lowercase());

    from_name.or_else(|| {
        let ext = match content_type {
            "video/mp4" => "mp4",
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => return None,
        };
        Some(ext.to_string())
    })
}
