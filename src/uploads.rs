use std::path::Path;

use anyhow::{Context, Result};
use uuid::Uuid;

/// Public URL prefix under which stored files are served.
pub const URL_PREFIX: &str = "/uploads";

/// Write an uploaded file under `dir` with a fresh name and return the URL
/// path it will be served from. The original filename only contributes its
/// extension, sanitized to a short alphanumeric suffix.
pub async fn store(dir: &str, original_name: &str, data: &[u8]) -> Result<String> {
    let extension = sanitize_extension(original_name);
    let filename = format!("{}.{}", Uuid::new_v4(), extension);

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create uploads directory {}", dir))?;
    tokio::fs::write(Path::new(dir).join(&filename), data)
        .await
        .with_context(|| format!("Failed to write upload {}", filename))?;

    Ok(format!("{}/{}", URL_PREFIX, filename))
}

fn sanitize_extension(original_name: &str) -> String {
    let extension = match original_name.rsplit_once('.') {
        Some((_, suffix)) => suffix,
        None => return "bin".to_string(),
    };

    let extension: String = extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_lowercase();

    if extension.is_empty() {
        "bin".to_string()
    } else {
        extension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> String {
        std::env::temp_dir()
            .join(format!("uploads-test-{}", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned()
    }

    #[tokio::test]
    async fn stores_file_and_returns_served_path() {
        let dir = temp_dir();
        let url = store(&dir, "photo.JPG", b"fake image bytes").await.unwrap();

        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".jpg"));

        let filename = url.rsplit('/').next().unwrap();
        let on_disk = tokio::fs::read(Path::new(&dir).join(filename)).await.unwrap();
        assert_eq!(on_disk, b"fake image bytes");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(sanitize_extension("a.png"), "png");
        assert_eq!(sanitize_extension("weird.P;N:G"), "png");
        assert_eq!(sanitize_extension("noextension"), "bin");
        assert_eq!(sanitize_extension("trailingdot."), "bin");
    }
}
