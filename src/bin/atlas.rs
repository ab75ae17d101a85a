use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use country_atlas::{
    Bounds, Client, Country, CountryService, Field, FilterOptions, JsonFileCache, SortOrder,
    storage,
};
use num_format::{Locale, ToFormattedString};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "atlas",
    version,
    about = "Fetch, cache & query country data (REST Countries, World Bank, Wikipedia)"
)]
struct Cli {
    /// Cache file path (defaults to the OS cache directory).
    #[arg(long, global = true)]
    cache: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Populate the cache (no-op when warm) and optionally export it.
    Fetch(FetchArgs),
    /// Show one country by its ISO 3166-1 alpha-2 code.
    Show { code: String },
    /// List countries with sort and filter controls.
    List(ListArgs),
    /// Print the min/max bounds of a numeric field.
    Range {
        #[arg(value_enum)]
        field: NumField,
    },
    /// Drop the cached collection; the next command re-fetches.
    Clear,
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Clear the cache first, forcing a re-aggregation.
    #[arg(long, default_value_t = false)]
    refresh: bool,
    /// Export the collection to a file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Export format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortField {
    Name,
    Cca2,
    Area,
    Population,
    Gdp,
    GdpPcap,
}

impl From<SortField> for Field {
    fn from(f: SortField) -> Self {
        match f {
            SortField::Name => Field::Name,
            SortField::Cca2 => Field::Cca2,
            SortField::Area => Field::Area,
            SortField::Population => Field::Population,
            SortField::Gdp => Field::Gdp,
            SortField::GdpPcap => Field::GdpPcap,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum NumField {
    Area,
    Population,
    Gdp,
    GdpPcap,
}

impl From<NumField> for Field {
    fn from(f: NumField) -> Self {
        match f {
            NumField::Area => Field::Area,
            NumField::Population => Field::Population,
            NumField::Gdp => Field::Gdp,
            NumField::GdpPcap => Field::GdpPcap,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Order {
    Asc,
    Desc,
}

impl From<Order> for SortOrder {
    fn from(o: Order) -> Self {
        match o {
            Order::Asc => SortOrder::Asc,
            Order::Desc => SortOrder::Desc,
        }
    }
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Field to sort by.
    #[arg(long, value_enum, default_value = "name")]
    sort_by: SortField,
    /// Sort direction.
    #[arg(long, value_enum, default_value = "asc")]
    order: Order,
    /// Keep only (in)dependent countries.
    #[arg(long)]
    independent: Option<bool>,
    /// Keep only UN members / non-members.
    #[arg(long)]
    un_member: Option<bool>,
    #[arg(long)]
    min_area: Option<f64>,
    #[arg(long)]
    max_area: Option<f64>,
    #[arg(long)]
    min_population: Option<f64>,
    #[arg(long)]
    max_population: Option<f64>,
    #[arg(long)]
    min_gdp: Option<f64>,
    #[arg(long)]
    max_gdp: Option<f64>,
    #[arg(long)]
    min_gdp_pcap: Option<f64>,
    #[arg(long)]
    max_gdp_pcap: Option<f64>,
    /// Show at most this many rows.
    #[arg(long)]
    limit: Option<usize>,
}

impl ListArgs {
    fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            independent: self.independent,
            un_member: self.un_member,
            area: bounds(self.min_area, self.max_area),
            population: bounds(self.min_population, self.max_population),
            gdp: bounds(self.min_gdp, self.max_gdp),
            gdp_pcap: bounds(self.min_gdp_pcap, self.max_gdp_pcap),
        }
    }
}

fn bounds(min: Option<f64>, max: Option<f64>) -> Option<Bounds> {
    if min.is_none() && max.is_none() {
        None
    } else {
        Some(Bounds { min, max })
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            if x.abs() >= 1000.0 {
                (x.round() as i64).to_formatted_string(&Locale::en)
            } else {
                let s = format!("{:.2}", x);
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            }
        }
        _ => "NA".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cache_path = match &cli.cache {
        Some(p) => p.clone(),
        None => JsonFileCache::default_path()?,
    };
    let service = CountryService::new(Client::default(), JsonFileCache::at(cache_path));

    match cli.cmd {
        Command::Fetch(args) => cmd_fetch(&service, args).await,
        Command::Show { code } => cmd_show(&service, &code).await,
        Command::List(args) => cmd_list(&service, args).await,
        Command::Range { field } => cmd_range(&service, field).await,
        Command::Clear => cmd_clear(&service),
    }
}

type Service = CountryService<Client, JsonFileCache>;

async fn cmd_fetch(service: &Service, args: FetchArgs) -> Result<()> {
    if args.refresh {
        service.clear_cache()?;
    }
    let countries = service.get_countries().await?;
    match service.cached_at()? {
        Some(ts) => println!("{} countries cached (fetched {})", countries.len(), ts),
        None => println!("{} countries fetched", countries.len()),
    }

    if let Some(path) = args.out.as_ref() {
        let fmt = match args.format {
            Some(OutFormat::Csv) => "csv",
            Some(OutFormat::Json) => "json",
            None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
        }
        .to_ascii_lowercase();
        match fmt.as_str() {
            "json" => storage::save_json(&countries, path)?,
            _ => storage::save_csv(&countries, path)?,
        }
        println!("exported to {}", path.display());
    }
    Ok(())
}

async fn cmd_show(service: &Service, code: &str) -> Result<()> {
    let Some(c) = service.get_country_by_code(code).await? else {
        anyhow::bail!("no country with code {code}");
    };
    println!("{} ({})", c.name, c.cca2);
    if let Some(desc) = &c.description {
        println!("  {desc}");
    }
    println!("  continents:  {}", c.continents.join(", "));
    println!("  independent: {}   un member: {}", c.independent, c.un_member);
    println!("  area:        {} km²", fmt_opt(Some(c.area)));
    println!("  population:  {}", fmt_opt(c.population.value));
    println!("  gdp:         {}", fmt_opt(c.gdp.value));
    println!("  gdp p.c.:    {}", fmt_opt(c.gdp_pcap.value));
    for (label, ind) in [("population", &c.population), ("gdp", &c.gdp)] {
        let recent: Vec<String> = ind
            .history
            .iter()
            .take(5)
            .map(|s| format!("{}: {}", s.year, fmt_opt(s.value)))
            .collect();
        if !recent.is_empty() {
            println!("  {label} history: {}", recent.join(" | "));
        }
    }
    if let Some(extract) = &c.extract {
        println!("\n{extract}");
    }
    Ok(())
}

async fn cmd_list(service: &Service, args: ListArgs) -> Result<()> {
    let filtered = service.get_filtered_countries(&args.filter_options()).await?;
    let sorted = service
        .get_sorted_countries(Some(filtered), args.sort_by.into(), args.order.into())
        .await?;
    let shown: &[Country] = match args.limit {
        Some(n) => &sorted[..n.min(sorted.len())],
        None => &sorted,
    };
    println!(
        "{:<32} {:>4} {:>14} {:>16} {:>20}",
        "name", "cca2", "area", "population", "gdp"
    );
    for c in shown {
        println!(
            "{:<32} {:>4} {:>14} {:>16} {:>20}",
            c.name,
            c.cca2,
            fmt_opt(Some(c.area)),
            fmt_opt(c.population.value),
            fmt_opt(c.gdp.value),
        );
    }
    println!("{} of {} countries", shown.len(), sorted.len());
    Ok(())
}

async fn cmd_range(service: &Service, field: NumField) -> Result<()> {
    let field: Field = field.into();
    let min = service.get_min(field).await?;
    let max = service.get_max(field).await?;
    match (min, max) {
        (Some(lo), Some(hi)) => println!("{field}: {} .. {}", fmt_opt(Some(lo)), fmt_opt(Some(hi))),
        _ => println!("{field}: no data"),
    }
    Ok(())
}

fn cmd_clear(service: &Service) -> Result<()> {
    service.clear_cache()?;
    println!("cache cleared");
    Ok(())
}
