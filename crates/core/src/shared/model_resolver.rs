use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found: {0}")]
    Missing(PathBuf),
    #[error("model {name} is not cached and no download URL was given")]
    NotCached { name: String },
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where to look for the acoustic model weights.
#[derive(Default)]
pub struct ModelSource<'a> {
    /// Path given explicitly by the operator. Must exist when set.
    pub explicit: Option<&'a Path>,
    /// Directory shipped next to the binary.
    pub bundled_dir: Option<&'a Path>,
    /// URL to fetch from when nothing local is found.
    pub url: Option<&'a str>,
}

/// Resolve a model file by name.
///
/// Resolution order:
/// 1. Explicit path (no fallback if it is missing)
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory
/// 4. Download from URL into the cache
pub fn resolve(
    name: &str,
    source: &ModelSource<'_>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = source.explicit {
        return if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(ModelResolveError::Missing(path.to_path_buf()))
        };
    }

    let cache_dir = model_cache_dir()?;
    if let Some(found) = find_local(name, &cache_dir, source.bundled_dir) {
        return Ok(found);
    }

    let url = source.url.ok_or_else(|| ModelResolveError::NotCached {
        name: name.to_string(),
    })?;
    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    let cached_path = cache_dir.join(name);
    log::info!("Downloading {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

fn find_local(name: &str, cache_dir: &Path, bundled_dir: Option<&Path>) -> Option<PathBuf> {
    let cached = cache_dir.join(name);
    if cached.exists() {
        return Some(cached);
    }
    bundled_dir
        .map(|dir| dir.join(name))
        .filter(|path| path.exists())
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Akshara/models/`
/// - Linux: `$XDG_CACHE_HOME/Akshara/models/` or `~/.cache/Akshara/models/`
/// - Windows: `%LOCALAPPDATA%/Akshara/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Akshara").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Akshara").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    // Written under a temp name and renamed so a failed download never
    // leaves a truncated model in the cache.
    let temp_path = dest.with_extension("part");
    let write_err = |path: &Path, e: std::io::Error| ModelResolveError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = fs::File::create(&temp_path).map_err(|e| write_err(&temp_path, e))?;

    let mut downloaded: u64 = 0;
    for chunk in bytes.chunks(1024 * 1024) {
        file.write_all(chunk).map_err(|e| write_err(&temp_path, e))?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(|e| write_err(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| write_err(dest, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path_is_returned_when_present() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("model.onnx");
        fs::write(&model, b"weights").unwrap();

        let source = ModelSource {
            explicit: Some(&model),
            ..Default::default()
        };
        assert_eq!(resolve("ignored.onnx", &source, None).unwrap(), model);
    }

    #[test]
    fn test_missing_explicit_path_does_not_fall_back() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("absent.onnx");
        let source = ModelSource {
            explicit: Some(&model),
            url: Some("http://invalid.nonexistent.example.com/model.onnx"),
            ..Default::default()
        };
        let err = resolve("absent.onnx", &source, None).unwrap_err();
        assert!(matches!(err, ModelResolveError::Missing(p) if p == model));
    }

    #[test]
    fn test_find_local_prefers_cache_over_bundled() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join("m.onnx"), b"cached").unwrap();
        fs::write(bundled.join("m.onnx"), b"bundled").unwrap();

        let found = find_local("m.onnx", &cache, Some(&bundled)).unwrap();
        assert_eq!(found, cache.join("m.onnx"));
    }

    #[test]
    fn test_find_local_uses_bundled_dir() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("m.onnx"), b"bundled").unwrap();

        let found = find_local("m.onnx", &cache, Some(&bundled)).unwrap();
        assert_eq!(found, bundled.join("m.onnx"));
        assert!(find_local("other.onnx", &cache, Some(&bundled)).is_none());
    }

    #[test]
    fn test_uncached_without_url_is_an_error() {
        let source = ModelSource::default();
        let err = resolve("akshara-test-never-cached-model.onnx", &source, None).unwrap_err();
        assert!(matches!(
            err,
            ModelResolveError::NotCached { .. } | ModelResolveError::NoCacheDir
        ));
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("Akshara"));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
