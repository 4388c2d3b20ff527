//! Format registry and background file loading
//!
//! # Architecture
//!
//! - **[`ParserRegistry`]**: static table of parsers and writers keyed by document MIME type,
//!   with a file-extension index for path based lookup
//! - **[`FileLoader`]**: parses files on rayon worker threads and delivers each
//!   [`FileLoadResult`] over a channel to the thread that owns the tree model

use crate::{Document, GeoDataError, Result, gpx_import, kml};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

pub const KML_MIME_TYPE: &str = "application/vnd.google-earth.kml+xml";
pub const GPX_MIME_TYPE: &str = "application/gpx+xml";

/// Reads one document format
pub trait DocumentParser: Send + Sync {
    fn mime_type(&self) -> &'static str;
    fn extensions(&self) -> &'static [&'static str];
    fn parse(&self, text: &str) -> Result<Document>;
}

/// Writes one document format
pub trait DocumentWriter: Send + Sync {
    fn mime_type(&self) -> &'static str;
    fn extensions(&self) -> &'static [&'static str];
    fn write(&self, document: &Document) -> Result<String>;
}

pub struct KmlFormat;

impl DocumentParser for KmlFormat {
    fn mime_type(&self) -> &'static str {
        KML_MIME_TYPE
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["kml"]
    }

    fn parse(&self, text: &str) -> Result<Document> {
        kml::parse_kml(text)
    }
}

impl DocumentWriter for KmlFormat {
    fn mime_type(&self) -> &'static str {
        KML_MIME_TYPE
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["kml"]
    }

    fn write(&self, document: &Document) -> Result<String> {
        kml::write_kml(document)
    }
}

pub struct GpxFormat;

impl DocumentParser for GpxFormat {
    fn mime_type(&self) -> &'static str {
        GPX_MIME_TYPE
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["gpx"]
    }

    fn parse(&self, text: &str) -> Result<Document> {
        gpx_import::parse_gpx(text)
    }
}

/// Parsers and writers by MIME type
pub struct ParserRegistry {
    parsers: HashMap<&'static str, Arc<dyn DocumentParser>>,
    writers: HashMap<&'static str, Arc<dyn DocumentWriter>>,
    extensions: HashMap<String, &'static str>,
}

/// Registry with the built-in KML and GPX formats
impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register_parser(Arc::new(KmlFormat));
        registry.register_parser(Arc::new(GpxFormat));
        registry.register_writer(Arc::new(KmlFormat));
        registry
    }
}

impl ParserRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
            writers: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    pub fn register_parser(&mut self, parser: Arc<dyn DocumentParser>) {
        for ext in parser.extensions() {
            self.extensions.insert(ext.to_ascii_lowercase(), parser.mime_type());
        }
        self.parsers.insert(parser.mime_type(), parser);
    }

    pub fn register_writer(&mut self, writer: Arc<dyn DocumentWriter>) {
        for ext in writer.extensions() {
            self.extensions
                .entry(ext.to_ascii_lowercase())
                .or_insert(writer.mime_type());
        }
        self.writers.insert(writer.mime_type(), writer);
    }

    pub fn parser(&self, mime_type: &str) -> Option<&Arc<dyn DocumentParser>> {
        self.parsers.get(mime_type)
    }

    pub fn writer(&self, mime_type: &str) -> Option<&Arc<dyn DocumentWriter>> {
        self.writers.get(mime_type)
    }

    /// MIME type registered for the path's extension (case-insensitive)
    pub fn mime_type_for_path(&self, path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.extensions.get(&ext).copied()
    }

    pub fn mime_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.parsers.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Read and parse `path`; the document remembers its file name
    pub fn parse_file(&self, path: &Path) -> Result<Document> {
        let parser = self
            .mime_type_for_path(path)
            .and_then(|mime| self.parser(mime))
            .ok_or_else(|| GeoDataError::UnsupportedFormat(path.display().to_string()))?;
        let text = std::fs::read_to_string(path)?;
        let mut document = parser.parse(&text)?;
        document.set_file_name(path.to_string_lossy());
        Ok(document)
    }

    pub fn write_file(&self, document: &Document, path: &Path) -> Result<()> {
        let writer = self
            .mime_type_for_path(path)
            .and_then(|mime| self.writer(mime))
            .ok_or_else(|| GeoDataError::UnsupportedFormat(path.display().to_string()))?;
        std::fs::write(path, writer.write(document)?)?;
        Ok(())
    }
}

/// Outcome of loading one file
#[derive(Debug)]
pub struct FileLoadResult {
    pub path: PathBuf,
    pub result: Result<Document>,
}

struct TaggedResult {
    generation: u64,
    inner: FileLoadResult,
}

/// Background document loader
///
/// Results are only handed out by the receiving side; a [`FileLoader::cancel`] drops
/// files not yet started and any results still in flight.
pub struct FileLoader {
    registry: Arc<ParserRegistry>,
    generation: Arc<AtomicU64>,
    sender: Sender<TaggedResult>,
    receiver: Receiver<TaggedResult>,
}

impl FileLoader {
    pub fn new(registry: Arc<ParserRegistry>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            registry,
            generation: Arc::new(AtomicU64::new(0)),
            sender,
            receiver,
        }
    }

    /// Queue `paths` for parsing on the rayon pool
    pub fn load(&self, paths: Vec<PathBuf>) {
        let registry = Arc::clone(&self.registry);
        let generation = Arc::clone(&self.generation);
        let current = generation.load(Ordering::Acquire);
        let sender = self.sender.clone();

        tracing::debug!(count = paths.len(), "Queueing files for loading");
        rayon::spawn(move || {
            #[cfg(feature = "profiling")]
            profiling::scope!("file_loader::load");

            paths.into_par_iter().for_each_with(sender, |tx, path| {
                if generation.load(Ordering::Acquire) != current {
                    return;
                }
                let result = registry.parse_file(&path);
                if let Err(e) = &result {
                    tracing::warn!("Failed to load {}: {}", path.display(), e);
                }
                // The receiver may be gone already
                let _ = tx.send(TaggedResult {
                    generation: current,
                    inner: FileLoadResult { path, result },
                });
            });
        });
    }

    /// Load synchronously, in parallel, in input order
    pub fn load_blocking(&self, paths: Vec<PathBuf>) -> Vec<FileLoadResult> {
        let registry = &*self.registry;
        paths
            .into_par_iter()
            .map(|path| FileLoadResult {
                result: registry.parse_file(&path),
                path,
            })
            .collect()
    }

    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Next finished result, if any, without blocking
    pub fn try_recv(&self) -> Option<FileLoadResult> {
        loop {
            let tagged = self.receiver.try_recv().ok()?;
            if let Some(result) = self.accept(tagged) {
                return Some(result);
            }
        }
    }

    /// Wait up to `timeout` for the next result
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FileLoadResult> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            let tagged = self.receiver.recv_timeout(remaining).ok()?;
            if let Some(result) = self.accept(tagged) {
                return Some(result);
            }
        }
    }

    fn accept(&self, tagged: TaggedResult) -> Option<FileLoadResult> {
        if tagged.generation == self.generation.load(Ordering::Acquire) {
            Some(tagged.inner)
        } else {
            tracing::debug!("Dropping stale result for {}", tagged.inner.path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoFeature;
    use std::io::Write;

    fn write_temp(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const KML: &str = "<kml><Document><name>k</name></Document></kml>";
    const GPX: &str = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="48.0" lon="11.0"><name>w</name></wpt>
</gpx>"#;

    #[test]
    fn test_lookup_by_extension() {
        let registry = ParserRegistry::default();
        assert_eq!(
            registry.mime_type_for_path(Path::new("a/b.KML")),
            Some(KML_MIME_TYPE)
        );
        assert_eq!(
            registry.mime_type_for_path(Path::new("track.gpx")),
            Some(GPX_MIME_TYPE)
        );
        assert!(registry.mime_type_for_path(Path::new("x.osm")).is_none());
        assert!(registry.writer(GPX_MIME_TYPE).is_none());
        assert_eq!(registry.mime_types(), vec![GPX_MIME_TYPE, KML_MIME_TYPE]);
    }

    #[test]
    fn test_parse_file_sets_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(dir.path(), "a.kml", KML);
        let doc = ParserRegistry::default().parse_file(&path).unwrap();
        assert_eq!(doc.name(), "k");
        assert_eq!(doc.file_name(), path.to_string_lossy());
    }

    #[test]
    fn test_unsupported_format() {
        let result = ParserRegistry::default().parse_file(Path::new("map.osm"));
        assert!(matches!(result, Err(GeoDataError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_background_loading() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_temp(dir.path(), "a.kml", KML),
            write_temp(dir.path(), "b.gpx", GPX),
            write_temp(dir.path(), "c.kml", "<kml><Document>"),
        ];
        let loader = FileLoader::new(Arc::new(ParserRegistry::default()));
        loader.load(paths);

        let mut results = Vec::new();
        while results.len() < 3 {
            let result = loader
                .recv_timeout(Duration::from_secs(10))
                .expect("loader should deliver every file");
            results.push(result);
        }
        results.sort_by(|a, b| a.path.cmp(&b.path));
        assert!(results[0].result.is_ok());
        assert_eq!(results[1].result.as_ref().unwrap().size(), 1);
        assert!(results[2].result.is_err());
    }

    #[test]
    fn test_cancel_drops_pending_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(dir.path(), "a.kml", KML);
        let loader = FileLoader::new(Arc::new(ParserRegistry::default()));
        loader.cancel();
        let stale = TaggedResult {
            generation: 0,
            inner: FileLoadResult {
                path: path.clone(),
                result: Ok(Document::new()),
            },
        };
        loader.sender.send(stale).unwrap();
        assert!(loader.try_recv().is_none());

        let loaded = loader.load_blocking(vec![path]);
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].result.is_ok());
    }
}
