// 🗺️ County Boundaries - GeoJSON polygons keyed by FIPS
// Geometry arrives through a BoundarySource so tests and offline runs can
// inject a local file instead of the network.

use crate::config::BoundaryConfig;
use crate::db::BoundaryCache;
use crate::error::{PipelineError, Result};
use crate::scale::CountyDataset;
use crate::zip::normalize_fips;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
#[cfg(feature = "http")]
use std::time::Duration;
use tracing::{debug, info, warn};

// ============================================================================
// SOURCES
// ============================================================================

/// Where the raw GeoJSON bytes come from
pub trait BoundarySource: Send + Sync {
    /// Retrieve the raw GeoJSON body
    fn fetch(&self) -> Result<Vec<u8>>;

    /// Identifier used in errors, logs and as the cache key
    fn describe(&self) -> String;
}

/// GeoJSON on local disk
pub struct FileBoundarySource {
    path: PathBuf,
}

impl FileBoundarySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBoundarySource { path: path.into() }
    }
}

impl BoundarySource for FileBoundarySource {
    fn fetch(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|e| PipelineError::boundary_fetch(self.describe(), e))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// GeoJSON downloaded once at startup
#[cfg(feature = "http")]
pub struct HttpBoundarySource {
    url: String,
    timeout: Duration,
}

#[cfg(feature = "http")]
impl HttpBoundarySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        HttpBoundarySource {
            url: url.into(),
            timeout,
        }
    }
}

#[cfg(feature = "http")]
impl BoundarySource for HttpBoundarySource {
    fn fetch(&self) -> Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| PipelineError::boundary_fetch(&self.url, e))?;

        let response = client
            .get(&self.url)
            .send()
            .map_err(|e| PipelineError::boundary_fetch(&self.url, e))?;

        if !response.status().is_success() {
            return Err(PipelineError::boundary_fetch(
                &self.url,
                format!("HTTP {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .map_err(|e| PipelineError::boundary_fetch(&self.url, e))?;
        debug!(url = %self.url, bytes = bytes.len(), "downloaded county boundaries");
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Wraps a source with the SQLite cache: refresh on success, fall back on failure
pub struct CachedBoundarySource<S> {
    inner: S,
    cache_path: PathBuf,
}

impl<S: BoundarySource> CachedBoundarySource<S> {
    pub fn new(inner: S, cache_path: impl Into<PathBuf>) -> Self {
        CachedBoundarySource {
            inner,
            cache_path: cache_path.into(),
        }
    }
}

impl<S: BoundarySource> BoundarySource for CachedBoundarySource<S> {
    fn fetch(&self) -> Result<Vec<u8>> {
        let key = self.inner.describe();

        match self.inner.fetch() {
            Ok(body) => {
                if let Err(e) = BoundaryCache::open(&self.cache_path).and_then(|c| c.store(&key, &body)) {
                    warn!(cache = %self.cache_path.display(), error = %e, "could not update boundary cache");
                }
                Ok(body)
            }
            Err(fetch_err) => {
                match BoundaryCache::open(&self.cache_path).and_then(|c| c.load(&key)) {
                    Ok(Some(cached)) => {
                        warn!(
                            source = %key,
                            fetched_at = %cached.fetched_at,
                            error = %fetch_err,
                            "boundary fetch failed, using cached copy"
                        );
                        Ok(cached.body)
                    }
                    Ok(None) => Err(fetch_err),
                    Err(cache_err) => {
                        warn!(cache = %self.cache_path.display(), error = %cache_err, "boundary cache unreadable");
                        Err(fetch_err)
                    }
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

/// Pick the source described by the configuration.
///
/// A local file wins over the URL; a configured cache wraps either.
pub fn boundary_source_for(config: &BoundaryConfig) -> Result<Box<dyn BoundarySource>> {
    let base: Box<dyn BoundarySource> = match &config.file {
        Some(path) => Box::new(FileBoundarySource::new(path)),
        None => http_source(config)?,
    };

    Ok(match &config.cache {
        Some(cache_path) => Box::new(CachedBoundarySource::new(base, cache_path)),
        None => base,
    })
}

#[cfg(feature = "http")]
fn http_source(config: &BoundaryConfig) -> Result<Box<dyn BoundarySource>> {
    Ok(Box::new(HttpBoundarySource::new(
        config.url.clone(),
        Duration::from_secs(config.timeout_secs),
    )))
}

#[cfg(not(feature = "http"))]
fn http_source(config: &BoundaryConfig) -> Result<Box<dyn BoundarySource>> {
    Err(PipelineError::boundary_fetch(
        config.url.clone(),
        "built without the `http` feature; set boundary.file instead",
    ))
}

impl BoundarySource for Box<dyn BoundarySource> {
    fn fetch(&self) -> Result<Vec<u8>> {
        (**self).fetch()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Value>,
}

impl Feature {
    /// FIPS from the feature id, else STATE + COUNTY properties
    fn fips(&self) -> Option<String> {
        let from_id = match &self.id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(normalize_fips(s)),
            Some(Value::Number(n)) => {
                let whole = n.as_u64().or_else(|| {
                    n.as_f64()
                        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
                        .map(|v| v as u64)
                })?;
                Some(normalize_fips(&whole.to_string()))
            }
            _ => None,
        };
        from_id.or_else(|| {
            let props = self.properties.as_ref()?;
            let state = props.get("STATE")?.as_str()?;
            let county = props.get("COUNTY")?.as_str()?;
            Some(normalize_fips(&format!("{state}{county}")))
        })
    }
}

/// County polygons by FIPS
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountyBoundaries {
    geometries: BTreeMap<String, Value>,
    skipped: usize,
}

impl CountyBoundaries {
    pub fn load(source: &dyn BoundarySource) -> Result<Self> {
        let body = source.fetch()?;
        let boundaries = Self::from_geojson(&body)
            .map_err(|reason| PipelineError::boundary_fetch(source.describe(), reason))?;

        if boundaries.skipped > 0 {
            warn!(skipped = boundaries.skipped, "boundary features without a FIPS id were skipped");
        }
        info!(source = %source.describe(), counties = boundaries.len(), "loaded county boundaries");
        Ok(boundaries)
    }

    /// Parse a GeoJSON FeatureCollection
    pub fn from_geojson(body: &[u8]) -> std::result::Result<Self, String> {
        let collection: FeatureCollection =
            serde_json::from_slice(body).map_err(|e| format!("invalid GeoJSON: {e}"))?;
        if collection.kind != "FeatureCollection" {
            return Err(format!("expected a FeatureCollection, got {}", collection.kind));
        }

        let mut boundaries = CountyBoundaries::default();
        for feature in collection.features {
            match (feature.fips(), feature.geometry) {
                (Some(fips), Some(geometry)) => {
                    boundaries.geometries.entry(fips).or_insert(geometry);
                }
                _ => boundaries.skipped += 1,
            }
        }
        Ok(boundaries)
    }

    pub fn contains(&self, fips: &str) -> bool {
        self.geometries.contains_key(fips)
    }

    pub fn geometry(&self, fips: &str) -> Option<&Value> {
        self.geometries.get(fips)
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Features dropped because no FIPS or geometry could be read
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Counties that have data but no polygon to draw it on
    pub fn missing_from<'a>(&self, dataset: &'a CountyDataset) -> Vec<&'a str> {
        dataset
            .counties
            .iter()
            .map(|c| c.fips.as_str())
            .filter(|fips| !self.contains(fips))
            .collect()
    }
}
