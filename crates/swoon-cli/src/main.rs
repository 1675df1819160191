use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use swoon_core::config::SwoonConfig;
use swoon_core::lifecycle::{self, NextStep, Presentation, SessionPolicy};
use swoon_core::model::*;
use swoon_core::ranking::{self, RankQuery, RankedDress, RankingWeights};
use swoon_core::seed::seed_demo;
use swoon_core::storage::{create_backend, Storage, StorageBackend};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "swoon", about = "Swoon: bridal swipe sessions", version)]
enum Cli {
    /// Create the demo shop with a sample catalog
    Seed {
        /// Seed for the random catalog (prices and attributes)
        #[arg(long)]
        seed: Option<u64>,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Register a shop
    ShopCreate {
        /// Shop name
        name: String,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// List shops
    Shops {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a dress to a shop's catalog
    DressAdd {
        /// Shop ID
        #[arg(long)]
        shop: Uuid,
        /// Dress name
        name: String,
        /// Price
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "")]
        brand: String,
        #[arg(long, default_value = "")]
        color: String,
        #[arg(long, default_value = "")]
        silhouette: String,
        #[arg(long, default_value = "")]
        neckline: String,
        #[arg(long, default_value = "")]
        fabric: String,
        /// Units in stock
        #[arg(long, default_value_t = 0)]
        stock: u32,
        /// Size span, e.g. "0-18"
        #[arg(long, default_value = "")]
        size_range: String,
        /// Comma-separated style keywords
        #[arg(long, default_value = "")]
        style_tags: String,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// List a shop's dresses
    Dresses {
        /// Shop ID
        #[arg(long)]
        shop: Uuid,
        /// Minimum price (inclusive)
        #[arg(long)]
        price_min: Option<f64>,
        /// Maximum price (inclusive)
        #[arg(long)]
        price_max: Option<f64>,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a swipe session for a bride
    SessionNew {
        /// Shop ID
        #[arg(long)]
        shop: Uuid,
        /// Operator (stylist) running the session
        #[arg(long)]
        operator: String,
        /// Bride's display name
        #[arg(long)]
        bride: Option<String>,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent sessions for a shop
    Sessions {
        /// Shop ID
        #[arg(long)]
        shop: Uuid,
        /// Maximum number of sessions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the next dress for a session
    Next {
        /// Session token
        token: Uuid,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a like or dislike
    Swipe {
        /// Session token
        token: Uuid,
        /// Dress ID
        dress: DressId,
        /// Decision
        #[arg(value_enum)]
        decision: Decision,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the ranked shortlist for a session
    Results {
        /// Session token
        token: Uuid,
        /// Maximum number of dresses (default from config)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Minimum price (inclusive)
        #[arg(long)]
        price_min: Option<f64>,
        /// Maximum price (inclusive)
        #[arg(long)]
        price_max: Option<f64>,
        /// Fix the exploration draw for a reproducible ordering
        #[arg(long)]
        seed: Option<u64>,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show configuration and storage status
    Status {
        /// Print the effective merged configuration as TOML
        #[arg(long)]
        config: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Decision {
    Like,
    Dislike,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swoon_core=warn".into()),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    let config = SwoonConfig::load(Some(&std::env::current_dir()?)).unwrap_or_else(|e| {
        tracing::warn!("failed to load config, using defaults: {e}");
        SwoonConfig::default_config()
    });

    run(cli, &config).await
}

async fn run(cli: Cli, config: &SwoonConfig) -> Result<()> {
    let storage = create_backend(config).context("failed to open storage")?;
    match cli {
        Cli::Seed { seed, json } => cmd_seed(&storage, seed, json).await,
        Cli::ShopCreate { name, json } => cmd_shop_create(&storage, name, json).await,
        Cli::Shops { json } => cmd_shops(&storage, json).await,
        Cli::DressAdd {
            shop,
            name,
            price,
            brand,
            color,
            silhouette,
            neckline,
            fabric,
            stock,
            size_range,
            style_tags,
            json,
        } => {
            let input = NewDress::new(shop, name, price)
                .with_brand(brand)
                .with_color(color)
                .with_silhouette(silhouette)
                .with_neckline(neckline)
                .with_fabric(fabric)
                .with_stock(stock)
                .with_size_range(size_range)
                .with_style_tags(style_tags);
            cmd_dress_add(&storage, input, json).await
        }
        Cli::Dresses {
            shop,
            price_min,
            price_max,
            json,
        } => cmd_dresses(&storage, shop, budget(price_min, price_max)?, json).await,
        Cli::SessionNew {
            shop,
            operator,
            bride,
            json,
        } => cmd_session_new(&storage, shop, &operator, bride.as_deref(), json).await,
        Cli::Sessions { shop, limit, json } => cmd_sessions(&storage, shop, limit, json).await,
        Cli::Next { token, json } => cmd_next(&storage, config, token, json).await,
        Cli::Swipe {
            token,
            dress,
            decision,
            json,
        } => cmd_swipe(&storage, config, token, dress, decision == Decision::Like, json).await,
        Cli::Results {
            token,
            limit,
            price_min,
            price_max,
            seed,
            json,
        } => {
            let query = RankQuery::new(limit.unwrap_or(config.ranking.default_limit))
                .with_price(budget(price_min, price_max)?);
            cmd_results(&storage, config, token, &query, seed, json).await
        }
        Cli::Status { config: true } => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Cli::Status { config: false } => cmd_status(&storage, config).await,
    }
}

/// clap accepts `NaN` and negative floats, so bounds are checked here.
fn budget(price_min: Option<f64>, price_max: Option<f64>) -> Result<PriceRange> {
    PriceRange::validated(price_min, price_max).context("invalid budget")
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_price(price: f64) -> String {
    format!("${price:.0}")
}

fn print_dress(dress: &Dress) {
    let details: Vec<&str> = [
        dress.brand.as_str(),
        dress.silhouette.as_str(),
        dress.neckline.as_str(),
        dress.fabric.as_str(),
        dress.color.as_str(),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect();
    println!(
        "  {}  {}  {}  {}",
        format!("#{:<5}", dress.id).cyan(),
        format!("{:<16}", dress.name).bold(),
        format!("{:>7}", format_price(dress.price)).green(),
        details.join(", ").dimmed(),
    );
}

async fn cmd_seed(storage: &Storage, seed: Option<u64>, json: bool) -> Result<()> {
    let mut rng = make_rng(seed);
    let report = seed_demo(storage, &mut rng)
        .await
        .context("failed to seed demo catalog")?;

    if json {
        return print_json(&report);
    }
    if report.skipped {
        println!(
            "{} {} already has dresses, skipping creation.",
            "!".yellow(),
            report.shop.name.bold()
        );
    } else {
        println!(
            "{} Seeded {} with {} dresses.",
            "✓".green(),
            report.shop.name.bold(),
            report.dresses_created
        );
    }
    println!("  {}  {}", "Shop ID:".dimmed(), report.shop.id);
    Ok(())
}

async fn cmd_shop_create(storage: &Storage, name: String, json: bool) -> Result<()> {
    validate_shop_name(&name)?;
    let shop = Shop::new(name.trim().to_string());
    storage.create_shop(&shop).await?;

    if json {
        return print_json(&shop);
    }
    println!("{} Created shop {}", "✓".green(), shop.name.bold());
    println!("  {}  {}", "Shop ID:".dimmed(), shop.id);
    Ok(())
}

async fn cmd_shops(storage: &Storage, json: bool) -> Result<()> {
    let shops = storage.list_shops().await?;
    if json {
        return print_json(&shops);
    }
    if shops.is_empty() {
        println!("No shops yet. Run {} to create a demo shop.", "swoon seed".cyan());
        return Ok(());
    }
    println!(
        "  {}  {}  {}",
        format!("{:<36}", "ID").dimmed(),
        format!("{:<10}", "Created").dimmed(),
        "Name".dimmed(),
    );
    println!("{}", "─".repeat(78).dimmed());
    for shop in &shops {
        println!(
            "  {}  {}  {}",
            shop.id,
            shop.created_at.format("%Y-%m-%d"),
            shop.name.bold()
        );
    }
    Ok(())
}

async fn cmd_dress_add(storage: &Storage, input: NewDress, json: bool) -> Result<()> {
    validate_new_dress(&input)?;
    let dress = storage.add_dress(&input).await?;
    if json {
        return print_json(&dress);
    }
    println!("{} Added dress", "✓".green());
    print_dress(&dress);
    Ok(())
}

async fn cmd_dresses(storage: &Storage, shop: Uuid, price: PriceRange, json: bool) -> Result<()> {
    storage.get_shop(shop).await?;
    let dresses = storage.list_dresses(shop, &price).await?;
    if json {
        return print_json(&dresses);
    }
    if dresses.is_empty() {
        println!("No dresses found.");
        return Ok(());
    }
    for dress in &dresses {
        print_dress(dress);
    }
    println!(
        "\n{} dress{}",
        dresses.len().to_string().cyan(),
        if dresses.len() == 1 { "" } else { "es" }
    );
    Ok(())
}

async fn cmd_session_new(
    storage: &Storage,
    shop: Uuid,
    operator: &str,
    bride: Option<&str>,
    json: bool,
) -> Result<()> {
    let session = lifecycle::create_session(storage, shop, operator, bride).await?;
    if json {
        return print_json(&session);
    }
    println!("{} Session started", "✓".green());
    println!("  {}  {}", "Token:".dimmed(), session.token.to_string().bold());
    if let Some(name) = &session.bride_name {
        println!("  {}  {}", "Bride:".dimmed(), name);
    }
    Ok(())
}

async fn cmd_sessions(storage: &Storage, shop: Uuid, limit: usize, json: bool) -> Result<()> {
    storage.get_shop(shop).await?;
    let sessions = storage.list_sessions(shop, limit).await?;
    if json {
        return print_json(&sessions);
    }
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }
    println!(
        "  {}  {}  {}  {}",
        format!("{:<36}", "Token").dimmed(),
        format!("{:<16}", "Created").dimmed(),
        format!("{:<9}", "Status").dimmed(),
        "Bride".dimmed(),
    );
    println!("{}", "─".repeat(78).dimmed());
    for session in &sessions {
        let status = format!("{:<9}", session.state.to_string());
        let status = if session.is_completed() {
            status.dimmed().to_string()
        } else {
            status.green().to_string()
        };
        println!(
            "  {}  {}  {}  {}",
            session.token,
            session.created_at.format("%Y-%m-%d %H:%M"),
            status,
            session.bride_name.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn cmd_next(storage: &Storage, config: &SwoonConfig, token: Uuid, json: bool) -> Result<()> {
    let policy = SessionPolicy::from(&config.session);
    let mut rng = make_rng(None);
    let presentation = lifecycle::present_next(storage, token, &policy, &mut rng).await?;

    if json {
        return print_json(&presentation);
    }
    match presentation {
        Presentation::Dress {
            dress,
            swipe_count,
            max_swipes,
        } => {
            println!(
                "{} {}",
                "Next dress".bold(),
                format!("({}/{max_swipes} swiped)", swipe_count).dimmed()
            );
            print_dress(&dress);
        }
        Presentation::Terminated => {
            println!(
                "{} Session is over. Run {} for the shortlist.",
                "■".yellow(),
                format!("swoon results {token}").cyan()
            );
        }
    }
    Ok(())
}

async fn cmd_swipe(
    storage: &Storage,
    config: &SwoonConfig,
    token: Uuid,
    dress_id: DressId,
    liked: bool,
    json: bool,
) -> Result<()> {
    let policy = SessionPolicy::from(&config.session);
    let mut rng = make_rng(None);
    let submitted = lifecycle::submit(
        storage,
        token,
        dress_id,
        liked,
        &policy,
        &config.retry,
        &mut rng,
    )
    .await?;

    if json {
        return print_json(&submitted);
    }

    let stored = if submitted.recorded.event.liked {
        "liked".green().to_string()
    } else {
        "disliked".red().to_string()
    };
    if submitted.recorded.created {
        println!("{} Dress #{dress_id} {stored}", "✓".green());
    } else {
        println!(
            "{} Dress #{dress_id} was already {stored}; keeping the first decision",
            "!".yellow()
        );
    }

    match &submitted.step {
        NextStep::Continue {
            next,
            swipe_count,
            max_swipes,
        } => {
            println!(
                "{} {}",
                "Next dress".bold(),
                format!("({swipe_count}/{max_swipes} swiped)").dimmed()
            );
            print_dress(next);
        }
        NextStep::Finish { .. } => {
            println!(
                "{} Session complete. Run {} for the shortlist.",
                "■".yellow(),
                format!("swoon results {token}").cyan()
            );
        }
    }
    Ok(())
}

async fn cmd_results(
    storage: &Storage,
    config: &SwoonConfig,
    token: Uuid,
    query: &RankQuery,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    if query.limit == 0 {
        anyhow::bail!("--limit must be at least 1");
    }
    let session = storage.get_session(token).await?;
    let weights = RankingWeights::from(&config.ranking);
    let mut rng = make_rng(seed);
    let ranked = ranking::rank(storage, session.shop_id, token, query, &weights, &mut rng).await?;

    if json {
        return print_json(&ranked);
    }
    if ranked.is_empty() {
        println!("No dresses match.");
        return Ok(());
    }

    println!(
        "{} {}",
        "Shortlist".bold(),
        session
            .bride_name
            .as_deref()
            .map(|n| format!("for {n}"))
            .unwrap_or_default()
            .dimmed()
    );
    for (i, entry) in ranked.iter().enumerate() {
        print_ranked(i + 1, entry);
    }
    if !session.is_completed() {
        println!(
            "\n{}",
            "Session still in progress; the shortlist may change.".dimmed()
        );
    }
    Ok(())
}

fn print_ranked(position: usize, entry: &RankedDress) {
    let signal = match entry.breakdown.base {
        b if b > 0.0 => "♥".green().to_string(),
        b if b < 0.0 => "✗".red().to_string(),
        _ => "·".dimmed().to_string(),
    };
    println!(
        "  {:>2}. {} {}  {}  {}  {}",
        position,
        signal,
        format!("#{:<5}", entry.dress.id).cyan(),
        format!("{:<16}", entry.dress.name).bold(),
        format!("{:>7}", format_price(entry.dress.price)).green(),
        format!("score {:.2}", entry.score).dimmed(),
    );
}

async fn cmd_status(storage: &Storage, config: &SwoonConfig) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    println!("{}", format!("Swoon Status v{version}").bold());
    println!("  {}    {}", "Storage:".dimmed(), storage.describe());

    match storage.list_shops().await {
        Ok(shops) => {
            println!("  {}      {}", "Shops:".dimmed(), shops.len().to_string().cyan());
            let mut dresses = 0;
            for shop in &shops {
                dresses += storage
                    .list_dresses(shop.id, &PriceRange::default())
                    .await?
                    .len();
            }
            println!("  {}    {}", "Dresses:".dimmed(), dresses.to_string().cyan());
        }
        Err(e) => println!("  {}      {} - {e}", "Shops:".dimmed(), "unavailable".red()),
    }

    println!("  {} {}", "Max swipes:".dimmed(), config.session.max_swipes);
    println!(
        "  {}    like +{} / dislike -{} / exploration <{}",
        "Ranking:".dimmed(),
        config.ranking.like_weight,
        config.ranking.dislike_weight,
        config.ranking.exploration
    );
    println!(
        "  {}    {}:{}",
        "Web API:".dimmed(),
        config.web.host,
        config.web.port
    );
    if let Some(path) = swoon_core::config::global_config_path() {
        println!("  {}     {}", "Config:".dimmed(), path.display());
    }
    Ok(())
}
