use crate::CLAP_STYLING;
use clap::{arg, command};

fn report_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-o --"output" <PATH>)
            .required(false)
            .help("Save report to file (default: display to screen)"),
    )
    .arg(
        arg!(-f --"format" <FORMAT>)
            .required(false)
            .help("Report format: text, json")
            .value_parser(["text", "json"])
            .default_value("text"),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("tagscope")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("tagscope")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(--"proxy-api-key" <KEY>)
                .required(false)
                .global(true)
                .env("TAGSCOPE_PROXY_API_KEY")
                .hide_env_values(true)
                .help("API key for the JavaScript rendering proxy. Pages are fetched directly when unset."),
        )
        .arg(
            arg!(--"proxy-url" <URL>)
                .required(false)
                .global(true)
                .env("TAGSCOPE_PROXY_URL")
                .help("Rendering proxy endpoint (default: ScrapingBee)"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .global(true)
                .help("Per-page fetch timeout in seconds")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value("8"),
        )
        .subcommand_required(false)
        .subcommand(report_args(
            command!("crawl")
                .about(
                    "Crawl a site breadth-first and report GTM and GA4 coverage for every \
                analyzed page.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The site to crawl")
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of sites to crawl")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-m --"max-pages" <NUM>)
                        .required(false)
                        .help("Maximum pages to analyze per site (1-50)")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"no-common-paths")
                        .required(false)
                        .help("Don't seed /about, /contact, /pricing and friends when starting from a homepage")
                        .action(clap::ArgAction::SetTrue),
                ),
        ))
        .subcommand(report_args(
            command!("analyze")
                .about("Analyze a single page: tags, measurement IDs and configuration markers")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page to analyze"),
                ),
        ))
        .subcommand(report_args(
            command!("score")
                .about("Score a GA4 configuration exported as JSON")
                .arg(
                    arg!(<FILE>)
                        .required(true)
                        .help("Path to a GA4 audit JSON file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        ))
        .subcommand(report_args(
            command!("audit")
                .about(
                    "Fetch a GA4 property's configuration through the Admin API and score it. \
                Lists accessible properties when no property is given.",
                )
                .arg(
                    arg!(-t --"token" <ACCESS_TOKEN>)
                        .required(true)
                        .env("TAGSCOPE_ACCESS_TOKEN")
                        .hide_env_values(true)
                        .help("OAuth access token with the analytics.readonly scope"),
                )
                .arg(
                    arg!(-p --"property" <PROPERTY_ID>)
                        .required(false)
                        .help("GA4 property ID, as 123456 or properties/123456"),
                )
                .arg(
                    arg!(--"admin-api-base" <URL>)
                        .required(false)
                        .env("TAGSCOPE_ADMIN_API_BASE")
                        .help("Override the Google Analytics Admin API base URL"),
                ),
        ))
        .subcommand(
            command!("serve")
                .about("Run the HTTP API")
                .arg(
                    arg!(-b --"bind" <ADDR>)
                        .required(false)
                        .env("TAGSCOPE_BIND")
                        .help("Address to listen on")
                        .value_parser(clap::value_parser!(std::net::SocketAddr))
                        .default_value("127.0.0.1:8787"),
                )
                .arg(
                    arg!(--"admin-api-base" <URL>)
                        .required(false)
                        .env("TAGSCOPE_ADMIN_API_BASE")
                        .help("Override the Google Analytics Admin API base URL"),
                ),
        )
}
