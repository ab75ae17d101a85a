use serde::{Deserialize, Serialize};

/// One historical observation of an indicator. `value` is `None` for years
/// the upstream source has no data for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub year: i32,
    pub value: Option<f64>,
}

/// A metric as a current scalar plus its history, ordered most-recent-first.
///
/// The current `value` is derived from the history when built via
/// [`Indicator::from_history`]: the first non-null entry wins, since the
/// World Bank returns observations newest-first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Indicator {
    pub value: Option<f64>,
    pub history: Vec<Sample>,
}

impl Indicator {
    /// Build an indicator from a most-recent-first history, deriving the
    /// current value as the first non-null sample.
    pub fn from_history(history: Vec<Sample>) -> Self {
        let value = history.iter().find_map(|s| s.value);
        Self { value, history }
    }
}

/// A fully merged country record. Identity key is `cca2` (ISO 3166-1
/// alpha-2); the collection treats records as immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub cca2: String,
    pub independent: bool,
    pub un_member: bool,
    pub continents: Vec<String>,
    pub area: f64,
    /// Short description from the encyclopedia summary, when available.
    pub description: Option<String>,
    /// Lead-section extract from the encyclopedia summary.
    pub extract: Option<String>,
    /// Inline SVG markup for the flag (not a URL).
    pub flag_svg: String,
    pub population: Indicator,
    pub gdp: Indicator,
    pub gdp_pcap: Indicator,
}

impl Country {
    /// The value-with-history metric behind `field`, if it is one.
    pub fn metric(&self, field: Field) -> Option<&Indicator> {
        match field {
            Field::Population => Some(&self.population),
            Field::Gdp => Some(&self.gdp),
            Field::GdpPcap => Some(&self.gdp_pcap),
            _ => None,
        }
    }

    /// Resolve `field` to a scalar number: plain numeric fields directly,
    /// metric fields through their current value. `None` for everything else
    /// and for metrics without a current value.
    pub fn numeric_value(&self, field: Field) -> Option<f64> {
        match field.kind() {
            ValueKind::Number => match field {
                Field::Area => Some(self.area),
                _ => None,
            },
            ValueKind::Metric => self.metric(field).and_then(|m| m.value),
            _ => None,
        }
    }
}

/// The closed set of fields sort/filter/min-max can address, each with a
/// declared value kind so dispatch is a total match rather than a runtime
/// type probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Name,
    Cca2,
    Independent,
    UnMember,
    Continents,
    Area,
    Population,
    Gdp,
    GdpPcap,
}

/// What a [`Field`] resolves to on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Bool,
    TextList,
    Number,
    /// Value-with-history; comparisons use the current scalar.
    Metric,
}

impl Field {
    pub fn kind(self) -> ValueKind {
        match self {
            Field::Name | Field::Cca2 => ValueKind::Text,
            Field::Independent | Field::UnMember => ValueKind::Bool,
            Field::Continents => ValueKind::TextList,
            Field::Area => ValueKind::Number,
            Field::Population | Field::Gdp | Field::GdpPcap => ValueKind::Metric,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Cca2 => "cca2",
            Field::Independent => "independent",
            Field::UnMember => "un_member",
            Field::Continents => "continents",
            Field::Area => "area",
            Field::Population => "population",
            Field::Gdp => "gdp",
            Field::GdpPcap => "gdp_pcap",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for [`crate::query::sorted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Inclusive numeric bounds; an unset side imposes no constraint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn contains(&self, v: f64) -> bool {
        self.min.is_none_or(|m| v >= m) && self.max.is_none_or(|m| v <= m)
    }
}

/// Filter criteria combined with logical AND; unset members match anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub independent: Option<bool>,
    pub un_member: Option<bool>,
    pub area: Option<Bounds>,
    pub population: Option<Bounds>,
    pub gdp: Option<Bounds>,
    pub gdp_pcap: Option<Bounds>,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// REST Countries record from the fields-restricted `all` endpoint.
/// `independent` is absent for a handful of territories; default it off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseCountry {
    pub name: RcName,
    pub cca2: String,
    #[serde(default)]
    pub independent: bool,
    #[serde(rename = "unMember", default)]
    pub un_member: bool,
    #[serde(default)]
    pub continents: Vec<String>,
    #[serde(default)]
    pub area: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcName {
    pub common: String,
}

/// Wikipedia REST `page/summary` response, reduced to what we keep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WikiSummary {
    pub description: Option<String>,
    pub extract: Option<String>,
}

/// Everything fetched per country beyond the base record.
#[derive(Debug, Clone)]
pub struct Supplements {
    pub summary: WikiSummary,
    pub flag_svg: String,
    pub population: Indicator,
    pub gdp: Indicator,
    pub gdp_pcap: Indicator,
}

impl Country {
    pub fn merge(base: BaseCountry, extra: Supplements) -> Self {
        Self {
            name: base.name.common,
            cca2: base.cca2,
            independent: base.independent,
            un_member: base.un_member,
            continents: base.continents,
            area: base.area,
            description: extra.summary.description,
            extract: extra.summary.extract,
            flag_svg: extra.flag_svg,
            population: extra.population,
            gdp: extra.gdp,
            gdp_pcap: extra.gdp_pcap,
        }
    }
}

/// Metadata section of a World Bank response (position 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub page: u32,
    pub pages: u32,
    /// Some responses encode `per_page` as a string, others as a number.
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub per_page: u32,
    pub total: u32,
}

fn de_u32_from_string_or_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Str(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse::<u32>().map_err(serde::de::Error::custom),
    }
}

/// Raw World Bank observation (position 1 array). Only the fields this crate
/// consumes; serde ignores the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub date: String,
    pub value: Option<f64>,
}

impl From<Entry> for Sample {
    fn from(e: Entry) -> Self {
        Sample {
            year: e.date.parse::<i32>().unwrap_or(0),
            value: e.value,
        }
    }
}

/// Envelope persisted by the cache store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCollection {
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub countries: Vec<Country>,
}
