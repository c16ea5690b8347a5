//! Product image files on local disk.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

const PRODUCT_DIR: &str = "products";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Invalid(String),

    #[error("file not found")]
    NotFound,

    #[error("file storage failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores product images under `<root>/products/<uuid>.<ext>`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_bytes: usize,
}

fn extension_of(name: &str) -> Result<String, UploadError> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| UploadError::Invalid("file has no extension".into()))?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::Invalid(format!(
            "unsupported image type '.{ext}', use jpg, jpeg, png or webp"
        )));
    }
    Ok(ext)
}

/// A stored file name: `[A-Za-z0-9_-]+.<allowed ext>`, nothing else.
fn check_file_name(name: &str) -> Result<(), UploadError> {
    let Some((stem, _)) = name.rsplit_once('.') else {
        return Err(UploadError::Invalid("invalid file name".into()));
    };
    let stem_ok = !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !stem_ok {
        return Err(UploadError::Invalid("invalid file name".into()));
    }
    extension_of(name).map(|_| ())
}

pub fn content_type(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Ok("png") => "image/png",
        Ok("webp") => "image/webp",
        Ok(_) => "image/jpeg",
        Err(_) => "application/octet-stream",
    }
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and write an uploaded image; returns the path relative to the root.
    pub async fn save_product_image(&self, original_name: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let ext = extension_of(original_name)?;
        if bytes.is_empty() {
            return Err(UploadError::Invalid("file is empty".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::Invalid(format!(
                "file is larger than {} bytes",
                self.max_bytes
            )));
        }

        let dir = self.root.join(PRODUCT_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        let file_name = format!("{}.{ext}", Uuid::now_v7());
        tokio::fs::write(dir.join(&file_name), bytes).await?;
        Ok(format!("{PRODUCT_DIR}/{file_name}"))
    }

    /// Remove a previously stored image. Failures are only logged.
    pub async fn remove_best_effort(&self, relative: &str) {
        let Some(name) = relative.strip_prefix(&format!("{PRODUCT_DIR}/")) else {
            warn!(path = %relative, "refusing to remove image outside the products directory");
            return;
        };
        if check_file_name(name).is_err() {
            warn!(path = %relative, "refusing to remove image with invalid name");
            return;
        }
        if let Err(err) = tokio::fs::remove_file(self.root.join(PRODUCT_DIR).join(name)).await {
            warn!(path = %relative, error = %err, "failed to remove old product image");
        }
    }

    /// Read a product image by its bare file name.
    pub async fn read_product_image(&self, name: &str) -> Result<Vec<u8>, UploadError> {
        check_file_name(name)?;
        match tokio::fs::read(self.root.join(PRODUCT_DIR).join(name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UploadError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("kopontren-uploads-{}", Uuid::now_v7()))
    }

    #[test]
    fn file_names_cannot_escape_the_directory() {
        assert!(check_file_name("0192.png").is_ok());
        assert!(check_file_name("../secret.png").is_err());
        assert!(check_file_name("a/b.png").is_err());
        assert!(check_file_name(".png").is_err());
        assert!(check_file_name("x.exe").is_err());
        assert!(check_file_name("noext").is_err());
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type("a.PNG"), "image/png");
        assert_eq!(content_type("a.jpeg"), "image/jpeg");
        assert_eq!(content_type("a.webp"), "image/webp");
    }

    #[tokio::test]
    async fn save_read_and_remove() {
        let store = ImageStore::new(temp_root(), 1024);
        let path = store.save_product_image("Foto Semen.JPG", b"fake-jpeg").await.unwrap();
        assert!(path.starts_with("products/") && path.ends_with(".jpg"));

        let name = path.trim_start_matches("products/");
        assert_eq!(store.read_product_image(name).await.unwrap(), b"fake-jpeg");

        store.remove_best_effort(&path).await;
        assert!(matches!(store.read_product_image(name).await, Err(UploadError::NotFound)));
    }

    #[tokio::test]
    async fn rejects_large_empty_and_unsupported_files() {
        let store = ImageStore::new(temp_root(), 4);
        assert!(matches!(store.save_product_image("a.png", b"12345").await, Err(UploadError::Invalid(_))));
        assert!(matches!(store.save_product_image("a.png", b"").await, Err(UploadError::Invalid(_))));
        assert!(matches!(store.save_product_image("a.gif", b"1").await, Err(UploadError::Invalid(_))));
    }
}
