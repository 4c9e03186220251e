//! Reads, writes, and compares hierarchical config values, the
//! counterpart of `cmd/config_client.py`.

use std::collections::BTreeSet;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use svclib_config::{backend_for_url, AppConfig, ConfigClient};

#[derive(Parser)]
#[command(name = "svclib-config-client")]
struct Cli {
    /// URL of the config server (defaults to SERVICELIB_CONFIG_URL)
    #[arg(long)]
    config_url: Option<String>,

    /// Verbose logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Get the value of a config key
    Get { key: String },
    /// Set the value of a config key (value is parsed as JSON)
    Set { key: String, value: String },
    /// Remove a setting from the config source
    Delete { key: String },
    /// Dump the whole config tree as JSON
    Dump,
    /// Compare config from two sources
    Diff { src: String, dest: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    svclib_cli::logging::configure(if cli.verbose { "debug" } else { "warn" });

    let result = match &cli.command {
        Command::Diff { src, dest } => run_diff(src, dest).await,
        other => run_single(cli.config_url.as_deref(), other).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(1)
        }
    }
}

fn client_for(url: Option<&str>) -> anyhow::Result<ConfigClient> {
    let url = url
        .map(str::to_string)
        .unwrap_or_else(|| AppConfig::from_env().config_url);
    let parsed = url::Url::parse(&url)?;
    let backend = backend_for_url(&parsed)?;
    Ok(ConfigClient::new(Arc::from(backend)))
}

async fn run_single(config_url: Option<&str>, command: &Command) -> anyhow::Result<()> {
    let client = client_for(config_url)?;
    match command {
        Command::Get { key } => {
            let value = client.get(key, None).await?;
            println!("{}", serde_json::to_string(&value)?);
        }
        Command::Set { key, value } => {
            let parsed: Value = serde_json::from_str(value)
                .map_err(|_| anyhow::anyhow!("Invalid JSON: <{value}>"))?;
            client.set(key, parsed).await?;
        }
        Command::Delete { key } => {
            client.delete(key).await?;
        }
        Command::Dump => {
            let value = client.dump().await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Diff { .. } => unreachable!("handled separately"),
    }
    Ok(())
}

async fn run_diff(src: &str, dest: &str) -> anyhow::Result<()> {
    let src_client = client_for(Some(src))?;
    let dest_client = client_for(Some(dest))?;
    let src_tree = src_client.dump().await?;
    let dest_tree = dest_client.dump().await?;
    for chunk in diff_values(&src_tree, &dest_tree, &[], src, dest) {
        print!("{chunk}");
    }
    Ok(())
}

fn dotted(base: &[String], key: &str) -> String {
    let mut path = base.to_vec();
    path.push(key.to_string());
    path.join(".")
}

/// Recursively compares two config trees the way `config_client.py`'s
/// `diff0` does, returning one chunk of output per difference rather than
/// printing directly, so the comparison logic is exercisable without a
/// live config source.
fn diff_values(src: &Value, dest: &Value, base: &[String], src_label: &str, dest_label: &str) -> Vec<String> {
    let (Some(src_obj), Some(dest_obj)) = (src.as_object(), dest.as_object()) else {
        return if src != dest {
            vec![scalar_diff(src, dest, base, src_label, dest_label)]
        } else {
            Vec::new()
        };
    };

    let mut out = Vec::new();
    let src_keys: BTreeSet<&String> = src_obj.keys().collect();
    let dest_keys: BTreeSet<&String> = dest_obj.keys().collect();

    for key in src_keys.difference(&dest_keys) {
        out.push(format!("Only in {src_label}: {}\n", dotted(base, key)));
    }

    for key in src_keys.intersection(&dest_keys) {
        let src_val = &src_obj[*key];
        let dest_val = &dest_obj[*key];
        if src_val == dest_val {
            continue;
        }
        let mut nested = base.to_vec();
        nested.push((*key).clone());
        if src_val.is_object() && dest_val.is_object() {
            out.extend(diff_values(src_val, dest_val, &nested, src_label, dest_label));
        } else {
            out.push(scalar_diff(src_val, dest_val, &nested, src_label, dest_label));
        }
    }

    for key in dest_keys.difference(&src_keys) {
        out.push(format!("Only in {dest_label}: {}\n", dotted(base, key)));
    }

    out
}

fn scalar_diff(src: &Value, dest: &Value, base: &[String], src_label: &str, dest_label: &str) -> String {
    let name = if base.is_empty() { "<root>".to_string() } else { base.join(".") };
    let src_text = serde_json::to_string_pretty(src).unwrap_or_default();
    let dest_text = serde_json::to_string_pretty(dest).unwrap_or_default();
    let diff = similar::TextDiff::from_lines(&src_text, &dest_text);
    diff.unified_diff()
        .header(&format!("{src_label}:{name}"), &format!("{dest_label}:{name}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flags_keys_only_on_one_side() {
        let src = json!({"a": 1, "b": 2});
        let dest = json!({"a": 1, "c": 3});
        let out = diff_values(&src, &dest, &[], "src", "dest");
        assert!(out.iter().any(|l| l.contains("Only in src: b")));
        assert!(out.iter().any(|l| l.contains("Only in dest: c")));
    }

    #[test]
    fn recurses_into_nested_objects() {
        let src = json!({"group": {"x": 1}});
        let dest = json!({"group": {"x": 2}});
        let out = diff_values(&src, &dest, &[], "src", "dest");
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("group.x"));
    }

    #[test]
    fn identical_trees_produce_no_diff() {
        let tree = json!({"a": {"b": 1}});
        assert!(diff_values(&tree, &tree, &[], "src", "dest").is_empty());
    }
}
