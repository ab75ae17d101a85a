//! The country data service: fetch, merge, cache, query.
//!
//! [`CountryService`] owns the persisted cache read-through and the
//! single-flight guarantee: no matter how many tasks ask for the collection
//! while it is cold, exactly one aggregation pipeline runs, and every caller
//! resolves to the same collection (or the same error).
//!
//! Both dependencies are injected: the HTTP side through
//! [`CountrySource`], the persistence side through [`CacheStore`], so tests
//! can substitute stubs for either.

use crate::api::CountrySource;
use crate::error::{Error, Result};
use crate::models::{CachedCollection, Country, Field, FilterOptions, SortOrder};
use crate::query;
use crate::storage::CacheStore;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, try_join_all};
use std::sync::Arc;
use tokio::sync::Mutex;

/// The full merged collection, shared between concurrent callers.
pub type Collection = Arc<Vec<Country>>;

type Flight = Shared<BoxFuture<'static, Result<Collection>>>;

pub struct CountryService<S, C> {
    inner: Arc<Inner<S, C>>,
}

impl<S, C> Clone for CountryService<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S, C> {
    source: S,
    cache: C,
    /// The in-flight aggregation, if any. Checked and set under one lock
    /// acquisition with no await point in between, so no task can observe a
    /// half-set handle.
    flight: Mutex<Option<Flight>>,
}

impl<S, C> CountryService<S, C>
where
    S: CountrySource + 'static,
    C: CacheStore + 'static,
{
    pub fn new(source: S, cache: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                cache,
                flight: Mutex::new(None),
            }),
        }
    }

    /// Return the full collection.
    ///
    /// Served from the persisted cache when warm. On a cold cache, joins the
    /// in-flight aggregation if one exists, otherwise starts it. The handle
    /// is cleared on both success and failure, so after an error the next
    /// call retries; the result is persisted before the handle is cleared,
    /// so late callers never re-fetch a collection that just landed.
    pub async fn get_countries(&self) -> Result<Collection> {
        if let Some(cached) = self.inner.cache.load()? {
            log::debug!("cache hit: {} countries", cached.countries.len());
            return Ok(Arc::new(cached.countries));
        }

        let flight = {
            let mut guard = self.inner.flight.lock().await;
            match guard.as_ref() {
                Some(f) => {
                    log::debug!("joining in-flight aggregation");
                    f.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let fut: Flight = async move {
                        // No early return in here: the handle below must be
                        // cleared on every path.
                        let result = match run_pipeline(&inner).await {
                            Ok(countries) => {
                                let collection = CachedCollection {
                                    fetched_at: Utc::now(),
                                    countries,
                                };
                                inner
                                    .cache
                                    .save(&collection)
                                    .map(|()| Arc::new(collection.countries))
                            }
                            Err(e) => Err(e),
                        };
                        *inner.flight.lock().await = None;
                        result
                    }
                    .boxed()
                    .shared();
                    *guard = Some(fut.clone());
                    fut
                }
            }
        };
        flight.await
    }

    /// Look up one record by exact `cca2` match; populates the cache first
    /// if needed.
    pub async fn get_country_by_code(&self, code: &str) -> Result<Option<Country>> {
        let countries = self.get_countries().await?;
        Ok(countries.iter().find(|c| c.cca2 == code).cloned())
    }

    /// Sort `countries` (or the full cached collection when `None`) by
    /// `field`; see [`query::sorted`] for the comparison rules.
    pub async fn get_sorted_countries(
        &self,
        countries: Option<Vec<Country>>,
        field: Field,
        order: SortOrder,
    ) -> Result<Vec<Country>> {
        match countries {
            Some(c) => query::sorted(&c, field, order),
            None => {
                let all = self.get_countries().await?;
                query::sorted(&all, field, order)
            }
        }
    }

    /// The subset of the collection matching all criteria in `options`.
    pub async fn get_filtered_countries(&self, options: &FilterOptions) -> Result<Vec<Country>> {
        let all = self.get_countries().await?;
        Ok(query::filtered(&all, options))
    }

    /// Minimum numeric value of `field`, `None` when no record has one.
    pub async fn get_min(&self, field: Field) -> Result<Option<f64>> {
        let all = self.get_countries().await?;
        Ok(query::min_value(&all, field))
    }

    /// Maximum numeric value of `field`, `None` when no record has one.
    pub async fn get_max(&self, field: Field) -> Result<Option<f64>> {
        let all = self.get_countries().await?;
        Ok(query::max_value(&all, field))
    }

    /// When the persisted collection was fetched, if one exists.
    pub fn cached_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.inner.cache.load()?.map(|c| c.fetched_at))
    }

    /// Drop the persisted collection; the next read re-aggregates.
    pub fn clear_cache(&self) -> Result<()> {
        self.inner.cache.clear()
    }
}

/// Fan-out/fan-in aggregation: base list first, then every country's
/// supplement group concurrently. A failing group fails the pipeline with
/// the country attached; partial collections are never returned.
async fn run_pipeline<S, C>(inner: &Inner<S, C>) -> Result<Vec<Country>>
where
    S: CountrySource,
    C: CacheStore,
{
    let bases = inner.source.fetch_base().await?;
    log::info!("aggregating {} countries", bases.len());
    let merged = try_join_all(bases.into_iter().map(|base| async move {
        let extra = inner
            .source
            .fetch_supplements(&base)
            .await
            .map_err(|e| e.for_country(&base.cca2))?;
        Ok::<_, Error>(Country::merge(base, extra))
    }))
    .await?;
    log::info!("aggregation complete: {} countries merged", merged.len());
    Ok(merged)
}
