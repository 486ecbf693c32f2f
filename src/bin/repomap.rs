//! Thin CLI front-end: parses a path and a handful of flags, runs an
//! analysis, and prints the summary. Config loading, output formatting, and
//! reporting are out of scope here; a real front-end would own those.

use std::path::PathBuf;
use std::process::ExitCode;

use repomap::config::AnalysisConfig;

fn format_usage() -> &'static str {
    "repomap - static analysis engine for JavaScript/TypeScript repositories\n\n\
Usage: repomap [path] [options]\n\n\
Options:\n  \
  --exclude <glob>       Exclude files matching glob (repeatable)\n  \
  --include <glob>       Restrict to files matching glob (repeatable)\n  \
  --max-file-size <n>    Skip files larger than n bytes\n  \
  --workers <n>          Cap concurrent worker threads\n  \
  --no-dependency        Skip dependency graph construction\n  \
  --no-components        Skip component roll-up\n  \
  --help                 Show this message\n"
}

fn parse_cli_args(args: &[String]) -> Result<AnalysisConfig, String> {
    let mut root = PathBuf::from(".");
    let mut config = None;
    let mut i = 0;
    let mut root_set = false;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Err(format_usage().to_string()),
            "--exclude" => {
                i += 1;
                let pattern = args.get(i).ok_or("--exclude requires a value")?.clone();
                config
                    .get_or_insert_with(|| AnalysisConfig::new(root.clone()))
                    .exclude_patterns
                    .push(pattern);
            }
            "--include" => {
                i += 1;
                let pattern = args.get(i).ok_or("--include requires a value")?.clone();
                config
                    .get_or_insert_with(|| AnalysisConfig::new(root.clone()))
                    .include_patterns
                    .push(pattern);
            }
            "--max-file-size" => {
                i += 1;
                let value: u64 = args
                    .get(i)
                    .ok_or("--max-file-size requires a value")?
                    .parse()
                    .map_err(|_| "--max-file-size must be a number".to_string())?;
                config
                    .get_or_insert_with(|| AnalysisConfig::new(root.clone()))
                    .max_file_size = value;
            }
            "--workers" => {
                i += 1;
                let value: usize = args
                    .get(i)
                    .ok_or("--workers requires a value")?
                    .parse()
                    .map_err(|_| "--workers must be a number".to_string())?;
                config
                    .get_or_insert_with(|| AnalysisConfig::new(root.clone()))
                    .max_concurrency = Some(value);
            }
            "--no-dependency" => {
                config
                    .get_or_insert_with(|| AnalysisConfig::new(root.clone()))
                    .enable_dependency = false;
            }
            "--no-components" => {
                config
                    .get_or_insert_with(|| AnalysisConfig::new(root.clone()))
                    .enable_component_map = false;
            }
            other if !root_set && !other.starts_with('-') => {
                root = PathBuf::from(other);
                root_set = true;
            }
            other => return Err(format!("unrecognized argument: {other}")),
        }
        i += 1;
    }

    let mut config = config.unwrap_or_else(|| AnalysisConfig::new(root.clone()));
    config.project_root = root;
    Ok(config)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match parse_cli_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    match repomap::analyze(config) {
        Ok(report) => {
            println!(
                "{} files, {} functions, {} classes, {} interfaces",
                report.summary.file_count,
                report.summary.total_functions,
                report.summary.total_classes,
                report.summary.total_interfaces,
            );
            if let Some(graph) = &report.graph {
                println!(
                    "{} dependency nodes, {} edges",
                    graph.stats.total_nodes, graph.stats.total_edges
                );
            }
            if let Some(components) = &report.components {
                println!("{} components", components.len());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("[repomap][error] {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root_and_flags() {
        let args: Vec<String> = vec![
            "src".to_string(),
            "--exclude".to_string(),
            "**/*.test.ts".to_string(),
            "--no-dependency".to_string(),
        ];
        let config = parse_cli_args(&args).unwrap();
        assert_eq!(config.project_root, PathBuf::from("src"));
        assert_eq!(config.exclude_patterns, vec!["**/*.test.ts".to_string()]);
        assert!(!config.enable_dependency);
    }

    #[test]
    fn rejects_unknown_flags() {
        let args: Vec<String> = vec!["--bogus".to_string()];
        assert!(parse_cli_args(&args).is_err());
    }

    #[test]
    fn defaults_to_current_directory() {
        let config = parse_cli_args(&[]).unwrap();
        assert_eq!(config.project_root, PathBuf::from("."));
    }
}
