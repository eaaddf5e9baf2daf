use clap::{Arg, Command};
use log::LevelFilter;
use mailrisk::{EmailFacts, EngineConfig, ThreatEngine};
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("mailrisk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Email threat scoring engine")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("mailrisk.yaml"),
        )
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .value_name("FILE")
                .help("Analyze an email facts JSON file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the full analysis as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        match EngineConfig::generate_default(path) {
            Ok(()) => {
                println!("Generated default configuration at {path}");
                return;
            }
            Err(e) => {
                eprintln!("Failed to generate configuration: {e}");
                process::exit(1);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = if std::path::Path::new(config_path).exists() {
        match EngineConfig::load_from_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                process::exit(1);
            }
        }
    } else {
        log::debug!("No config file at {config_path}; using defaults");
        EngineConfig::default()
    };

    if matches.get_flag("test-config") {
        println!("Configuration is valid");
        return;
    }

    let Some(email_path) = matches.get_one::<String>("email") else {
        eprintln!("Nothing to do: pass --email FILE (or --generate-config / --test-config)");
        process::exit(2);
    };

    let facts = match load_facts(email_path) {
        Ok(facts) => facts,
        Err(e) => {
            eprintln!("Failed to load email facts: {e}");
            process::exit(1);
        }
    };

    let engine = match ThreatEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to initialize engine: {e}");
            process::exit(1);
        }
    };

    let analysis = engine.analyze(&facts).await;

    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&analysis) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize analysis: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let verdict = &analysis.verdict;
    println!("Score:          {}/100", verdict.score);
    println!("Level:          {}", verdict.level.as_str());
    println!("Recommendation: {}", verdict.recommendation);
    if !verdict.reasons.is_empty() {
        println!("Reasons:");
        for reason in &verdict.reasons {
            println!("  - {reason}");
        }
    }
    println!(
        "Sender:         {} (SPF: {}, DMARC: {}, DKIM: {})",
        analysis.sender.domain,
        analysis.sender.spf.as_str(),
        analysis.sender.dmarc.as_str(),
        analysis.sender.dkim.as_str()
    );
    if analysis.urls.dangerous_count > 0 {
        println!("Dangerous URLs:");
        for url in &analysis.urls.dangerous_urls {
            println!("  - {url}");
        }
    }
    if analysis.attachments.dangerous_count > 0 {
        println!("Dangerous attachments:");
        for result in &analysis.attachments.results {
            if result.dangerous {
                println!("  - {} ({})", result.filename, result.flags.join(", "));
            }
        }
    }
}

fn load_facts(path: &str) -> anyhow::Result<EmailFacts> {
    let content = std::fs::read_to_string(path)?;
    let facts: EmailFacts = serde_json::from_str(&content)?;
    Ok(facts)
}
