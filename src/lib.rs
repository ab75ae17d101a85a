//! country_atlas
//!
//! A lightweight Rust library for fetching, caching, and querying country
//! data aggregated from REST Countries, the World Bank Indicators API, and
//! Wikipedia page summaries. Pairs with the `atlas` CLI.
//!
//! ### Features
//! - One-shot aggregation: base list plus per-country summary, flag, and
//!   population/GDP/GDP-per-capita histories, merged into immutable records
//! - Single-flight deduplication: concurrent requests share one aggregation
//! - Persisted JSON cache with explicit clear
//! - Sort, filter, and min/max queries over a closed field set
//!
//! ### Example
//! ```no_run
//! use country_atlas::{Client, CountryService, Field, JsonFileCache, SortOrder};
//!
//! # async fn demo() -> country_atlas::Result<()> {
//! let cache = JsonFileCache::at(JsonFileCache::default_path()?);
//! let service = CountryService::new(Client::default(), cache);
//! let countries = service.get_countries().await?;
//! let by_population = service
//!     .get_sorted_countries(None, Field::Population, SortOrder::Desc)
//!     .await?;
//! println!("{} countries, largest: {}", countries.len(), by_population[0].name);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod query;
pub mod service;
pub mod storage;

pub use api::{Client, CountrySource};
pub use error::{Error, Result};
pub use models::{Bounds, Country, Field, FilterOptions, Indicator, Sample, SortOrder};
pub use service::{Collection, CountryService};
pub use storage::{CacheStore, JsonFileCache, MemoryCache};
