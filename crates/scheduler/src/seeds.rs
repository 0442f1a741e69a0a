use std::path::Path;

use otto_kv::Queue;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Default)]
struct SeedFile {
    #[serde(default)]
    seeds: Vec<serde_yaml::Value>,
}

/// Parses a YAML seed file of the form `seeds: [url, ...]`. Returns an
/// empty list (never an error) if the file is missing, unreadable, or not
/// valid YAML, matching the original loader's "no seeds" fallback.
/// Non-string entries in the `seeds` list are silently skipped rather than
/// failing the whole file.
pub fn load_seeds(path: &Path) -> Vec<String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    let parsed: SeedFile = match serde_yaml::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "invalid seed file, ignoring");
            return Vec::new();
        }
    };
    parsed
        .seeds
        .into_iter()
        .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Pushes `seeds` onto `output_queue` in order, stopping early if the queue
/// is already at `max_size` (backpressure). Returns the number actually
/// enqueued.
pub async fn enqueue_seeds(
    output_queue: &dyn Queue,
    max_size: usize,
    seeds: &[String],
) -> Result<usize, otto_core::FetcherError> {
    let mut enqueued = 0;
    for url in seeds {
        let current = output_queue.size().await?;
        if current >= max_size {
            warn!(current, max_size, "backpressure: output queue at max size, skipping remaining seeds");
            break;
        }
        output_queue.enqueue(url).await?;
        enqueued += 1;
        if enqueued <= 5 {
            info!(url, enqueued, "seed enqueued");
        }
    }
    Ok(enqueued)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> tempfile_path::TempPath {
        tempfile_path::TempPath::new(contents)
    }

    mod tempfile_path {
        use std::io::Write;
        use std::path::{Path, PathBuf};

        /// Minimal scratch-file helper so tests don't need the `tempfile`
        /// crate for what's otherwise a one-liner.
        pub struct TempPath(PathBuf);

        impl TempPath {
            pub fn new(contents: &str) -> Self {
                let path = std::env::temp_dir().join(format!(
                    "otto-scheduler-seeds-test-{}-{}.yaml",
                    std::process::id(),
                    contents.len()
                ));
                let mut file = std::fs::File::create(&path).unwrap();
                file.write_all(contents.as_bytes()).unwrap();
                Self(path)
            }
        }

        impl std::ops::Deref for TempPath {
            type Target = Path;
            fn deref(&self) -> &Path {
                &self.0
            }
        }

        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }
    }

    #[test]
    fn missing_file_yields_no_seeds() {
        assert_eq!(load_seeds(Path::new("/nonexistent/seeds.yaml")), Vec::<String>::new());
    }

    #[test]
    fn empty_file_yields_no_seeds() {
        let path = write_temp("");
        assert_eq!(load_seeds(&path), Vec::<String>::new());
    }

    #[test]
    fn empty_seeds_key_yields_no_seeds() {
        let path = write_temp("seeds: []");
        assert_eq!(load_seeds(&path), Vec::<String>::new());
    }

    #[test]
    fn invalid_yaml_yields_no_seeds() {
        let path = write_temp("seeds:\n  - not a list at next line\nbroken");
        assert_eq!(load_seeds(&path), Vec::<String>::new());
    }

    #[test]
    fn valid_list_is_parsed_in_order() {
        let path = write_temp("seeds:\n  - https://a.com/1\n  - https://b.com/2\n");
        assert_eq!(
            load_seeds(&path),
            vec!["https://a.com/1".to_string(), "https://b.com/2".to_string()]
        );
    }

    #[test]
    fn non_string_entries_are_skipped() {
        let path = write_temp("seeds:\n  - https://a.com\n  - 123\n  - null\n");
        assert_eq!(load_seeds(&path), vec!["https://a.com".to_string()]);
    }
}
