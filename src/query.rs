//! Sort, filter, and min/max over a country collection.
//!
//! All functions are pure and dispatch on the closed [`Field`] enumeration;
//! there is no runtime type sniffing. Metric fields ([`ValueKind::Metric`])
//! are always resolved to their current scalar value first.

use crate::error::{Error, Result};
use crate::models::{Bounds, Country, Field, FilterOptions, SortOrder, ValueKind};
use std::cmp::Ordering;

/// Return a new vector sorted by `field`.
///
/// Text fields compare case-insensitively (with a bytewise tiebreak so the
/// ordering is total); numeric and metric fields compare by value. Sorting by
/// a boolean or list field, or by a metric some record has no current value
/// for, fails with [`Error::UnsupportedSortKey`].
pub fn sorted(countries: &[Country], field: Field, order: SortOrder) -> Result<Vec<Country>> {
    let mut out: Vec<Country> = countries.to_vec();
    match field.kind() {
        ValueKind::Text => {
            out.sort_by(|a, b| {
                apply_order(cmp_text(text_value(a, field), text_value(b, field)), order)
            });
        }
        ValueKind::Number | ValueKind::Metric => {
            // Resolve up front so a missing value surfaces as the named
            // error instead of a silently arbitrary ordering.
            for c in countries {
                if c.numeric_value(field).is_none() {
                    return Err(Error::UnsupportedSortKey(format!(
                        "{field} (no numeric value for {})",
                        c.cca2
                    )));
                }
            }
            out.sort_by(|a, b| {
                let va = c_num(a, field);
                let vb = c_num(b, field);
                apply_order(va.partial_cmp(&vb).unwrap_or(Ordering::Equal), order)
            });
        }
        ValueKind::Bool => {
            return Err(Error::UnsupportedSortKey(format!("{field} (boolean field)")));
        }
        ValueKind::TextList => {
            return Err(Error::UnsupportedSortKey(format!("{field} (list field)")));
        }
    }
    Ok(out)
}

fn apply_order(ord: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn text_value(c: &Country, field: Field) -> &str {
    match field {
        Field::Name => &c.name,
        Field::Cca2 => &c.cca2,
        _ => "",
    }
}

fn c_num(c: &Country, field: Field) -> f64 {
    // Presence was verified by the caller; Equal-on-NaN keeps sort_by total.
    c.numeric_value(field).unwrap_or(f64::NAN)
}

/// Return the subset matching all supplied criteria (logical AND).
pub fn filtered(countries: &[Country], options: &FilterOptions) -> Vec<Country> {
    countries
        .iter()
        .filter(|c| matches(c, options))
        .cloned()
        .collect()
}

/// Whether one record passes the filter. A record whose metric has no
/// current value fails any range criterion on it — a normal non-match, not
/// an error.
pub fn matches(c: &Country, o: &FilterOptions) -> bool {
    o.independent.is_none_or(|want| c.independent == want)
        && o.un_member.is_none_or(|want| c.un_member == want)
        && in_range(c, Field::Area, o.area)
        && in_range(c, Field::Population, o.population)
        && in_range(c, Field::Gdp, o.gdp)
        && in_range(c, Field::GdpPcap, o.gdp_pcap)
}

fn in_range(c: &Country, field: Field, bounds: Option<Bounds>) -> bool {
    match bounds {
        None => true,
        Some(b) => c.numeric_value(field).is_some_and(|v| b.contains(v)),
    }
}

/// Minimum numeric value of `field` across the collection, or `None` when no
/// record resolves to a number (including the empty collection).
pub fn min_value(countries: &[Country], field: Field) -> Option<f64> {
    numeric_values(countries, field).reduce(f64::min)
}

/// Maximum counterpart of [`min_value`].
pub fn max_value(countries: &[Country], field: Field) -> Option<f64> {
    numeric_values(countries, field).reduce(f64::max)
}

fn numeric_values(countries: &[Country], field: Field) -> impl Iterator<Item = f64> + '_ {
    countries.iter().filter_map(move |c| c.numeric_value(field))
}
