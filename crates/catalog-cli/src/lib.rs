use anyhow::{anyhow, Context};
use catalog_core::models::FileSlot;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Initialize tracing for the CLI.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(
                    "warn,catalog=info,catalog_services=info,catalog_db=info,catalog_storage=info",
                )),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Parse a slot name such as `thumb_file` or `thumb`.
pub fn parse_slot(value: &str) -> anyhow::Result<FileSlot> {
    let normalized = value.trim().to_lowercase();
    FileSlot::ALL
        .into_iter()
        .find(|slot| {
            let key = slot.attribute_key();
            key == normalized || key.strip_suffix("_file") == Some(normalized.as_str())
        })
        .ok_or_else(|| anyhow!("Unknown file slot '{}'", value))
}

/// Parse a `--file slot=path` argument.
pub fn parse_file_arg(value: &str) -> anyhow::Result<(FileSlot, PathBuf)> {
    let (slot, path) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected slot=path, got '{}'", value))?;
    if path.is_empty() {
        return Err(anyhow!("Missing path for slot '{}'", slot));
    }
    Ok((parse_slot(slot)?, PathBuf::from(path)))
}

/// Content type sent with a file, from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
