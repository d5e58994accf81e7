use anyhow::{Context, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tagscope_core::admin::AccountSummary;
use tagscope_core::crawl::{CrawlProgressCallback, generate_crawl_report};
use tagscope_core::report::{ReportData, ReportFormat, render_report, save_report};
use tagscope_core::{AdminClient, CrawlOptions, Ga4Audit, execute_crawl, score_audit};
use tagscope_scanner::normalize::{normalize_url, with_default_scheme};
use tagscope_scanner::source::DEFAULT_TIMEOUT_SECS;
use tagscope_scanner::{FetchConfig, ProxyConfig, analyze_page};
use tagscope_server::AppState;

// Helper functions for crawl handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&String>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        parse_url_line(url)
            .map(|u| vec![u])
            .ok_or_else(|| format!("Invalid URL: {}", url))
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file. Blank lines and `#` comments are skipped.
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, adding https:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let candidate = with_default_scheme(line);
    if candidate.contains(char::is_whitespace) {
        eprintln!("⚠️  Skipping invalid URL '{}'", line);
        return None;
    }
    match normalize_url(&candidate) {
        Some(url) => Some(url),
        None => {
            eprintln!("⚠️  Skipping invalid URL '{}'", line);
            None
        }
    }
}

/// Read a GA4 audit from JSON. Accepts a bare audit or a saved
/// `/api/ga4-audit` response carrying it under `audit`.
pub fn load_audit_from_file(path: &Path) -> anyhow::Result<Ga4Audit> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read audit file {}", path.display()))?;
    let mut value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    if !value.is_object() {
        bail!("{} does not contain a JSON object", path.display());
    }
    if let Some(inner) = value.get_mut("audit").filter(|v| v.is_object()) {
        value = inner.take();
    }

    serde_json::from_value(value)
        .with_context(|| format!("{} is not a GA4 audit", path.display()))
}

/// Build the page-fetch configuration from the global flags
pub fn fetch_config_from_args(args: &ArgMatches) -> FetchConfig {
    let timeout = args
        .get_one::<u64>("timeout")
        .copied()
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let proxy = args
        .get_one::<String>("proxy-api-key")
        .filter(|key| !key.trim().is_empty())
        .map(|key| {
            let proxy = ProxyConfig::new(key.trim());
            match args.get_one::<String>("proxy-url") {
                Some(endpoint) => proxy.with_endpoint(endpoint.as_str()),
                None => proxy,
            }
        });

    FetchConfig {
        timeout: Duration::from_secs(timeout),
        proxy,
        ..FetchConfig::default()
    }
}

fn report_format(args: &ArgMatches) -> ReportFormat {
    args.get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text)
}

/// Print the report, or save it when `--output` is given
fn emit_report(data: &ReportData, args: &ArgMatches) -> anyhow::Result<()> {
    let format = report_format(args);
    let content = render_report(data, format).context("Failed to render report")?;

    match args.get_one::<String>("output") {
        Some(path) => {
            let written = save_report(&content, path)
                .with_context(|| format!("Failed to write report to {}", path))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                written.display().to_string().bright_white()
            );
        }
        None => print!("{}", content),
    }
    Ok(())
}

// Decorations go to stderr so stdout carries only the report
fn print_divider() {
    eprintln!("{}", "═".repeat(60).bright_blue().bold());
}

pub fn print_banner() {
    print_divider();
    eprintln!(
        "{}  {}",
        "  TAGSCOPE".bright_white().bold(),
        format!("v{} - GTM & GA4 tracking auditor", env!("CARGO_PKG_VERSION")).bright_black()
    );
    print_divider();
    eprintln!();
}

pub async fn handle_crawl(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let url = sub_matches.get_one::<String>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let max_pages = *sub_matches.get_one::<usize>("max-pages").unwrap_or(&10);
    let seed_common_paths = !sub_matches.get_flag("no-common-paths");
    let fetch = fetch_config_from_args(sub_matches);

    let urls = load_urls_from_source(url, hosts_file).map_err(|e| anyhow!(e))?;

    eprintln!("\n🔎 Crawling {} site(s)", urls.len());
    eprintln!("Max pages: {}", max_pages);
    eprintln!(
        "Fetching: {}\n",
        if fetch.proxy.is_some() {
            "rendering proxy"
        } else {
            "direct (no JavaScript)"
        }
    );

    let progress_callback: CrawlProgressCallback = Arc::new(|msg: String| {
        tracing::debug!("{}", msg);
    });

    let mut failures = 0;
    for site in &urls {
        let options = CrawlOptions {
            url: site.clone(),
            max_pages,
            fetch: fetch.clone(),
            seed_common_paths,
            show_progress_bars: true,
        };

        let summary = match execute_crawl(options, Some(progress_callback.clone())).await {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("{} Crawl of {} failed: {}", "✗".red().bold(), site, e);
                failures += 1;
                continue;
            }
        };

        eprintln!("\n{} Crawl complete!\n", "✓".green().bold());

        if sub_matches.get_one::<String>("output").is_none()
            && report_format(sub_matches) == ReportFormat::Text
        {
            print!("{}", generate_crawl_report(&summary));
        }
        emit_report(&ReportData::Crawl(summary), sub_matches)?;
    }

    if failures == urls.len() {
        bail!("No site could be crawled");
    }
    Ok(())
}

pub async fn handle_analyze(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let raw = sub_matches
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    let url = parse_url_line(raw).ok_or_else(|| anyhow!("Invalid URL: {}", raw))?;

    let source = fetch_config_from_args(sub_matches)
        .build_source()
        .context("Failed to build page fetcher")?;

    eprintln!("\n🔎 Analyzing {}\n", url);
    let analysis = analyze_page(source.as_ref(), &url)
        .await
        .with_context(|| format!("Could not analyze {}", url))?;

    emit_report(&ReportData::Page(analysis), sub_matches)
}

pub fn handle_score(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let path = sub_matches
        .get_one::<PathBuf>("FILE")
        .ok_or_else(|| anyhow!("An audit file is required"))?;

    let audit = load_audit_from_file(path)?;
    let report = score_audit(&audit);
    emit_report(&ReportData::Score(report), sub_matches)
}

fn admin_client(sub_matches: &ArgMatches) -> anyhow::Result<AdminClient> {
    let mut admin = AdminClient::new().context("Failed to build Admin API client")?;
    if let Some(base) = sub_matches.get_one::<String>("admin-api-base") {
        admin = admin.with_api_base(base.as_str());
    }
    Ok(admin)
}

fn print_accounts(accounts: &[AccountSummary]) {
    if accounts.is_empty() {
        println!("{} No GA4 accounts are visible to this token.", "⚠".yellow().bold());
        return;
    }
    for account in accounts {
        println!("{}", account.display_name.bright_white().bold());
        for property in &account.property_summaries {
            println!(
                "  {} {} {}",
                "•".blue(),
                property.property_id().bright_cyan(),
                property.display_name
            );
        }
        if account.property_summaries.is_empty() {
            println!("  {}", "(no properties)".bright_black());
        }
    }
    println!();
    println!("Run again with --property <PROPERTY_ID> to audit one of them.");
}

pub async fn handle_audit(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let token = sub_matches
        .get_one::<String>("token")
        .ok_or_else(|| anyhow!("--token is required"))?;
    let admin = admin_client(sub_matches)?;

    let user = admin
        .validate_token(token)
        .await
        .context("Access token could not be validated")?;
    if let Some(ref email) = user.email {
        eprintln!("{} Signed in as {}\n", "✓".green().bold(), email.bright_white());
    }

    let Some(property) = sub_matches.get_one::<String>("property") else {
        let accounts = admin.list_properties(token).await?;
        print_accounts(&accounts);
        return Ok(());
    };

    let audit = admin
        .fetch_audit(token, property)
        .await
        .with_context(|| format!("Could not fetch configuration for {}", property))?;
    let report = score_audit(&audit);
    emit_report(&ReportData::Score(report), sub_matches)
}

pub async fn handle_serve(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let bind = sub_matches
        .get_one::<SocketAddr>("bind")
        .copied()
        .ok_or_else(|| anyhow!("--bind is required"))?;
    let fetch = fetch_config_from_args(sub_matches);
    let admin_base = sub_matches
        .get_one::<String>("admin-api-base")
        .map(String::as_str);

    let state = AppState::from_config(&fetch, admin_base)?;
    println!(
        "{} Serving on {}",
        "→".blue(),
        format!("http://{}", bind).bright_white()
    );
    tagscope_server::serve(bind, state).await?;
    Ok(())
}
