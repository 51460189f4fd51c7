use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Paths already handed to the answer pipeline during this process.
///
/// A path is claimed before processing starts and only released when a run
/// fails in a retryable way, so a duplicate creation event can retry it once.
#[derive(Debug, Default)]
pub struct ProcessedSet {
    paths: Mutex<HashSet<PathBuf>>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the path was already claimed.
    pub fn try_claim(&self, path: &Path) -> bool {
        self.lock().insert(path.to_path_buf())
    }

    pub fn release(&self, path: &Path) -> bool {
        self.lock().remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        self.paths.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive_until_released() {
        let set = ProcessedSet::new();
        let path = Path::new("capturas/capture_1.png");

        assert!(set.try_claim(path));
        assert!(!set.try_claim(path));
        assert!(set.release(path));
        assert!(set.try_claim(path));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_release_unknown_path() {
        let set = ProcessedSet::new();
        assert!(!set.release(Path::new("missing.png")));
        assert!(set.is_empty());
    }
}
