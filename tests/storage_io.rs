use chrono::Utc;
use country_atlas::error::Error;
use country_atlas::models::{CachedCollection, Country, Indicator, Sample};
use country_atlas::storage::{self, CacheStore, JsonFileCache};
use std::fs;

fn sample(n: usize) -> Vec<Country> {
    (0..n)
        .map(|i| Country {
            name: format!("Country {i}"),
            cca2: format!("C{i}"),
            independent: true,
            un_member: i % 2 == 0,
            continents: vec!["Europe".into(), "Asia".into()],
            area: 100.0 + i as f64,
            description: Some("A test country".into()),
            extract: None,
            flag_svg: "<svg xmlns=\"http://www.w3.org/2000/svg\"/>".into(),
            population: Indicator::from_history(vec![Sample {
                year: 2023,
                value: Some(1_000_000.0 + i as f64),
            }]),
            gdp: Indicator::default(),
            gdp_pcap: Indicator::default(),
        })
        .collect()
}

#[test]
fn save_csv_and_json() {
    let rows = sample(3);
    let dir = tempfile::tempdir().unwrap();

    let csv_path = dir.path().join("countries.csv");
    storage::save_csv(&rows, &csv_path).unwrap();
    let csv_txt = fs::read_to_string(&csv_path).unwrap();
    assert!(csv_txt.starts_with("name,cca2,independent,"));
    assert_eq!(csv_txt.lines().count(), 1 + rows.len());
    // Continents are joined, not exploded into columns.
    assert!(csv_txt.contains("Europe|Asia"));

    let json_path = dir.path().join("countries.json");
    storage::save_json(&rows, &json_path).unwrap();
    let v: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(v.as_array().unwrap().len(), rows.len());
}

#[test]
fn file_cache_survives_a_new_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache/countries.json");

    let cache = JsonFileCache::at(&path);
    cache
        .save(&CachedCollection {
            fetched_at: Utc::now(),
            countries: sample(2),
        })
        .unwrap();

    // A fresh handle over the same path sees the same collection.
    let reopened = JsonFileCache::at(&path);
    let loaded = reopened.load().unwrap().unwrap();
    assert_eq!(loaded.countries.len(), 2);
    assert_eq!(loaded.countries[0].cca2, "C0");

    reopened.clear().unwrap();
    assert!(cache.load().unwrap().is_none());
    // Clearing an already-cold cache is not an error.
    cache.clear().unwrap();
}

#[test]
fn corrupt_cache_document_is_an_explicit_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("countries.json");
    fs::write(&path, "{ not json").unwrap();

    let cache = JsonFileCache::at(&path);
    let err = cache.load().unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[test]
fn default_path_lands_in_the_crate_cache_dir() {
    let path = JsonFileCache::default_path().unwrap();
    assert!(path.ends_with("country-atlas/countries.json"));
}
