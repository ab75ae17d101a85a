use assert_cmd::prelude::*;
use chrono::Utc;
use country_atlas::models::{CachedCollection, Country, Indicator, Sample};
use country_atlas::storage::{CacheStore, JsonFileCache};
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;

fn s(year: i32, value: Option<f64>) -> Sample {
    Sample { year, value }
}

fn country(name: &str, cca2: &str, population: Option<f64>) -> Country {
    Country {
        name: name.into(),
        cca2: cca2.into(),
        independent: true,
        un_member: true,
        continents: vec!["Europe".into()],
        area: 750.0,
        description: Some(format!("Description of {name}")),
        extract: Some(format!("{name} is a test country.")),
        flag_svg: "<svg/>".into(),
        population: Indicator::from_history(vec![s(2023, population)]),
        gdp: Indicator::from_history(vec![s(2023, Some(2_000_000.0))]),
        gdp_pcap: Indicator::default(),
    }
}

/// Seed a cache file so commands run without any network access.
fn seed_cache(path: &Path) {
    let cache = JsonFileCache::at(path);
    cache
        .save(&CachedCollection {
            fetched_at: Utc::now(),
            countries: vec![
                country("Aland", "AA", Some(1_000_000.0)),
                country("Beland", "BB", Some(5_000_000.0)),
            ],
        })
        .unwrap();
}

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("atlas").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("atlas"));
}

#[test]
fn cli_rejects_unknown_subcommand() {
    let mut cmd = Command::cargo_bin("atlas").unwrap();
    cmd.arg("frobnicate");
    cmd.assert().failure();
}

#[test]
fn show_renders_a_cached_country() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("countries.json");
    seed_cache(&cache);

    let mut cmd = Command::cargo_bin("atlas").unwrap();
    cmd.args(["--cache", cache.to_str().unwrap(), "show", "BB"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Beland (BB)"))
        .stdout(predicate::str::contains("5,000,000"));
}

#[test]
fn show_unknown_code_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("countries.json");
    seed_cache(&cache);

    let mut cmd = Command::cargo_bin("atlas").unwrap();
    cmd.args(["--cache", cache.to_str().unwrap(), "show", "ZZ"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no country with code ZZ"));
}

#[test]
fn list_sorts_descending_by_population() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("countries.json");
    seed_cache(&cache);

    let mut cmd = Command::cargo_bin("atlas").unwrap();
    cmd.args([
        "--cache",
        cache.to_str().unwrap(),
        "list",
        "--sort-by",
        "population",
        "--order",
        "desc",
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out).unwrap();
    let beland = text.find("Beland").expect("Beland listed");
    let aland = text.find("Aland").expect("Aland listed");
    assert!(beland < aland, "expected Beland before Aland:\n{text}");
    assert!(text.contains("2 of 2 countries"));
}

#[test]
fn list_applies_range_filters() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("countries.json");
    seed_cache(&cache);

    let mut cmd = Command::cargo_bin("atlas").unwrap();
    cmd.args([
        "--cache",
        cache.to_str().unwrap(),
        "list",
        "--min-population",
        "2000000",
        "--max-population",
        "10000000",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Beland"))
        .stdout(predicate::str::contains("1 of 1 countries"))
        .stdout(predicate::str::contains("Aland").not());
}

#[test]
fn range_reports_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("countries.json");
    seed_cache(&cache);

    let mut cmd = Command::cargo_bin("atlas").unwrap();
    cmd.args(["--cache", cache.to_str().unwrap(), "range", "population"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,000,000 .. 5,000,000"));
}

#[test]
fn clear_removes_the_cache_file() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("countries.json");
    seed_cache(&cache);
    assert!(cache.exists());

    let mut cmd = Command::cargo_bin("atlas").unwrap();
    cmd.args(["--cache", cache.to_str().unwrap(), "clear"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("cache cleared"));
    assert!(!cache.exists());
}

// Live test (opt-in): cargo test --features online
#[cfg(feature = "online")]
#[test]
fn fetch_online_populates_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("countries.json");

    let mut cmd = Command::cargo_bin("atlas").unwrap();
    cmd.args(["--cache", cache.to_str().unwrap(), "fetch"]);
    cmd.assert().success();
    assert!(cache.exists());
}
