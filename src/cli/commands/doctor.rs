//! Doctor command - verify keys, storage and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::index::{IndexType, INDEX_FILE};
use console::style;
use futures::future::join_all;
use std::path::Path;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Concierge Doctor");
    println!();
    println!("Checking keys, storage and configuration...\n");

    let mut checks = Vec::new();

    let keys = check_api_keys(settings);
    print_section("API Keys", &keys);
    checks.extend(keys);

    let storage = check_storage(settings);
    print_section("Storage", &storage);
    checks.extend(storage);

    let services = check_services(settings).await;
    print_section("Services", &services);
    checks.extend(services);

    let config = vec![check_config_file(config_path)];
    print_section("Configuration", &config);
    checks.extend(config);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Concierge.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Concierge is ready to use.");
    }

    Ok(())
}

/// Show the first and last few characters of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_key(name: &str, value: Option<&str>, required: bool, hint: &str) -> CheckResult {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(key) => CheckResult::ok(name, &format!("configured ({})", mask(key))),
        None if required => CheckResult::error(name, "not set", hint),
        None => CheckResult::warning(name, "not set", hint),
    }
}

fn check_api_keys(settings: &Settings) -> Vec<CheckResult> {
    let openai = std::env::var("OPENAI_API_KEY").ok();
    let mut results = vec![
        check_key(
            "OPENAI_API_KEY",
            openai.as_deref(),
            true,
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        check_key(
            "TRIPADVISOR_API_KEY",
            settings.services.tripadvisor.api_key.as_deref(),
            false,
            "Review lookups will fail until it is set",
        ),
        check_key(
            "BING_SEARCH_KEY",
            settings.services.bing.subscription_key.as_deref(),
            false,
            "Web search will fail until it is set",
        ),
    ];

    if settings.loader.use_parse_service {
        results.push(check_key(
            "LLAMA_CLOUD_API_KEY",
            settings.loader.parse_api_key.as_deref(),
            true,
            "Required while USE_LLAMA_PARSE is on",
        ));
    }
    results
}

fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.is_dir() {
        results.push(CheckResult::ok("Data directory", &data_dir.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (missing)", data_dir.display()),
            "Put source documents there before running 'concierge generate'",
        ));
    }

    let storage_dir = settings.storage_dir();
    for index_type in IndexType::ALL {
        let name = format!("{} index", index_type);
        let file = crate::index::storage_path(&storage_dir, index_type).join(INDEX_FILE);
        match std::fs::metadata(&file) {
            Ok(meta) => results.push(CheckResult::ok(
                &name,
                &format!("{} ({})", file.display(), format_size(meta.len())),
            )),
            Err(_) => results.push(CheckResult::warning(
                &name,
                "not built yet",
                &format!("Build with: concierge generate {}", index_type),
            )),
        }
    }

    results
}

/// Probe each configured service concurrently; any HTTP answer counts as reachable.
async fn check_services(settings: &Settings) -> Vec<CheckResult> {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            return vec![CheckResult::warning(
                "HTTP client",
                &format!("could not be created: {}", e),
                "Service reachability was not checked",
            )]
        }
    };

    let mut targets = vec![
        ("Venue API", settings.services.venues.base_url.clone()),
        ("TripAdvisor", settings.services.tripadvisor.base_url.clone()),
    ];
    if settings.services.bing.subscription_key.is_some() {
        targets.push(("Bing Search", settings.services.bing.endpoint.clone()));
    }

    let probes = targets.into_iter().map(|(name, url)| {
        let client = client.clone();
        async move {
            match client.get(&url).send().await {
                Ok(response) => CheckResult::ok(name, &format!("{} (HTTP {})", url, response.status().as_u16())),
                Err(e) => CheckResult::warning(
                    name,
                    &format!("{} unreachable", url),
                    &format!("Tools using it will report transport errors: {}", e),
                ),
            }
        }
    });

    join_all(probes).await
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: concierge config edit",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
