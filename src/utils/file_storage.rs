use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use uuid::Uuid;

/// Where time-out attachments end up.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persists `bytes` and returns the path to record against the attendance row.
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String>;

    async fn delete(&self, path: &str) -> Result<()>;
}

/// Stores files below `<root>/attendance/`.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Keeps only the final path component and drops characters that do not
/// belong in a file name.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join("attendance");
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let path = dir.join(format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name)));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        Ok(path.to_string_lossy().into_owned())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("removing {path}"))
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    /// Records stores and deletes; can be told to fail the n-th store.
    #[derive(Default)]
    pub struct InMemoryFileStorage {
        pub stored: Mutex<Vec<String>>,
        pub deleted: Mutex<Vec<String>>,
        fail_on_store: Option<usize>,
        fail_deletes: bool,
    }

    impl InMemoryFileStorage {
        pub fn failing_on_store(n: usize) -> Self {
            Self {
                fail_on_store: Some(n),
                ..Self::default()
            }
        }

        pub fn failing_deletes() -> Self {
            Self {
                fail_deletes: true,
                ..Self::default()
            }
        }

        /// Paths stored and not deleted since.
        pub fn live(&self) -> Vec<String> {
            let deleted = self.deleted.lock().unwrap();
            self.stored
                .lock()
                .unwrap()
                .iter()
                .filter(|p| !deleted.contains(p))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl FileStorage for InMemoryFileStorage {
        async fn store(&self, file_name: &str, _bytes: &[u8]) -> Result<String> {
            let mut stored = self.stored.lock().unwrap();
            if self.fail_on_store == Some(stored.len() + 1) {
                return Err(anyhow!("disk full"));
            }
            let path = format!("mem/{}-{}", stored.len() + 1, sanitize_file_name(file_name));
            stored.push(path.clone());
            Ok(path)
        }

        async fn delete(&self, path: &str) -> Result<()> {
            if self.fail_deletes {
                return Err(anyhow!("permission denied"));
            }
            self.deleted.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }
}
