//! Persisted cache for the merged collection, plus CSV/JSON export.
//!
//! The cache is one JSON document (the browser-storage-slot model: a single
//! key holding the serialized collection). [`CacheStore`] is the seam the
//! service talks through; [`JsonFileCache`] is the durable implementation,
//! [`MemoryCache`] the ephemeral one used in tests and one-shot sessions.

use crate::error::{Error, Result};
use crate::models::{CachedCollection, Country};
use csv::WriterBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage backend for the cached collection.
pub trait CacheStore: Send + Sync {
    /// Load the cached collection, `None` on a cold cache.
    fn load(&self) -> Result<Option<CachedCollection>>;
    fn save(&self, collection: &CachedCollection) -> Result<()>;
    /// Drop the cached collection; the next read goes to the network.
    fn clear(&self) -> Result<()>;
}

/// File-backed cache holding one pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<os cache dir>/country-atlas/countries.json`.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::cache_dir()
            .ok_or_else(|| Error::Storage("unable to determine cache directory".into()))?
            .join("country-atlas");
        Ok(dir.join("countries.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for JsonFileCache {
    fn load(&self) -> Result<Option<CachedCollection>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        let collection: CachedCollection = serde_json::from_str(&text)?;
        Ok(Some(collection))
    }

    fn save(&self, collection: &CachedCollection) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(collection)?;
        fs::write(&self.path, text)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-memory cache; contents end with the process (session-scoped storage).
#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: Mutex<Option<CachedCollection>>,
}

impl MemoryCache {
    fn guard(&self) -> std::sync::MutexGuard<'_, Option<CachedCollection>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl CacheStore for MemoryCache {
    fn load(&self) -> Result<Option<CachedCollection>> {
        Ok(self.guard().clone())
    }

    fn save(&self, collection: &CachedCollection) -> Result<()> {
        *self.guard() = Some(collection.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.guard() = None;
        Ok(())
    }
}

/// Save the collection as CSV with header, one row per country with current
/// metric values (history is not flattened into the export).
pub fn save_csv<P: AsRef<Path>>(countries: &[Country], path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| Error::Storage(e.to_string()))?;
    wtr.serialize((
        "name",
        "cca2",
        "independent",
        "un_member",
        "continents",
        "area",
        "population",
        "gdp",
        "gdp_pcap",
    ))
    .map_err(|e| Error::Storage(e.to_string()))?;
    for c in countries {
        wtr.serialize((
            &c.name,
            &c.cca2,
            c.independent,
            c.un_member,
            c.continents.join("|"),
            c.area,
            c.population.value,
            c.gdp.value,
            c.gdp_pcap.value,
        ))
        .map_err(|e| Error::Storage(e.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save the collection as a pretty JSON array of full records.
pub fn save_json<P: AsRef<Path>>(countries: &[Country], path: P) -> Result<()> {
    let text = serde_json::to_string_pretty(countries)?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Indicator;
    use chrono::Utc;
    use tempfile::tempdir;

    fn country(cca2: &str) -> Country {
        Country {
            name: format!("Land {cca2}"),
            cca2: cca2.into(),
            independent: true,
            un_member: true,
            continents: vec!["Europe".into()],
            area: 1000.0,
            description: None,
            extract: None,
            flag_svg: "<svg/>".into(),
            population: Indicator::default(),
            gdp: Indicator::default(),
            gdp_pcap: Indicator::default(),
        }
    }

    #[test]
    fn file_cache_round_trip_and_clear() {
        let dir = tempdir().unwrap();
        let cache = JsonFileCache::at(dir.path().join("countries.json"));
        assert!(cache.load().unwrap().is_none());

        let collection = CachedCollection {
            fetched_at: Utc::now(),
            countries: vec![country("DE"), country("FR")],
        };
        cache.save(&collection).unwrap();
        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.countries, collection.countries);

        cache.clear().unwrap();
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn write_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        let countries = vec![country("DE")];
        save_csv(&countries, &csvp).unwrap();
        save_json(&countries, &jsonp).unwrap();
        let csv_txt = fs::read_to_string(&csvp).unwrap();
        assert!(csv_txt.starts_with("name,cca2,"));
        assert!(jsonp.exists());
    }
}
