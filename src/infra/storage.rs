use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const POSTS_PREFIX: &str = "posts";

/// Local media storage. Post images land under `<root>/posts/` and the
/// returned key (`posts/<filename>`) is what gets persisted on the post row;
/// serving the files is the web server's job, not ours.
#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join(POSTS_PREFIX))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores an uploaded image and returns its storage key. The original
    /// filename is kept when free; a name collision gets a content-hash
    /// suffix instead of overwriting the existing file.
    pub async fn store_post_image(&self, file_name: &str, data: &[u8]) -> Result<String> {
        let name = sanitize_file_name(file_name);
        let dir = self.root.join(POSTS_PREFIX);

        let mut target = dir.join(&name);
        let mut key_name = name.clone();
        if target.exists() {
            key_name = disambiguate(&name, data);
            target = dir.join(&key_name);
        }

        tokio::fs::write(&target, data)
            .await
            .map_err(|err| anyhow!("failed to write {}: {}", target.display(), err))?;

        Ok(format!("{}/{}", POSTS_PREFIX, key_name))
    }

    /// Removes a stored file by its key. A file that is already gone is not
    /// an error.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let path = self.root.join(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(anyhow!("failed to remove {}: {}", path.display(), err)),
        }
    }
}

/// Keeps only the final path component, reduced to a safe character set.
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn disambiguate(name: &str, data: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(data));
    let tag = &digest[..8];
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, tag, ext),
        _ => format!("{}_{}", name, tag),
    }
}
