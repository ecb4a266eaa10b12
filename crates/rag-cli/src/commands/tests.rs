//! Unit tests for CLI commands.

use super::*;
use crate::commands::graph::GraphFormat;
use crate::Cli;
use camino::Utf8PathBuf;
use clap::Parser;
use rag_config::merge::DEFAULT_MAX_CYCLES;
use rag_config::LogFormat;
use tempfile::TempDir;

fn test_config() -> RagConfig {
    RagConfig {
        max_cycles: DEFAULT_MAX_CYCLES,
        deadline_ms: None,
        store_backend: StoreBackend::Memory,
        store_path: Utf8PathBuf::from("unused.json"),
        log_level: "info".to_string(),
        log_format: LogFormat::Text,
        sources: Vec::new(),
    }
}

/// Create a test command context that records its output
fn create_test_context(json: bool) -> CommandContext {
    CommandContext::with_detector(test_config(), DeadlockDetector::new(), OutputHandler::buffered(json))
}

fn run(ctx: &CommandContext, args: &[&str]) -> Result<Status> {
    let cli = Cli::try_parse_from(std::iter::once("rag").chain(args.iter().copied())).unwrap();
    dispatch_command(cli.command, ctx)
}

fn deadlocked(ctx: &CommandContext) {
    run(ctx, &["add-process", "P1"]).unwrap();
    run(ctx, &["add-process", "P2"]).unwrap();
    run(ctx, &["add-resource", "R1"]).unwrap();
    run(ctx, &["add-resource", "R2"]).unwrap();
    run(ctx, &["request", "P1", "R1"]).unwrap();
    run(ctx, &["allocate", "P2", "R1"]).unwrap();
    run(ctx, &["request", "P2", "R2"]).unwrap();
    run(ctx, &["allocate", "P1", "R2"]).unwrap();
}

#[test]
fn test_suggest_similar_id() {
    let ids = ["P1", "P2", "printer", "R1"];

    assert_eq!(suggest_similar_id("p1", ids), Some("P1".to_string()));
    assert_eq!(suggest_similar_id("printr", ids), Some("printer".to_string()));
    assert_eq!(suggest_similar_id("scanner-7", ids), None);
    assert_eq!(suggest_similar_id("P1", std::iter::empty()), None);
}

#[test]
fn test_edit_distance() {
    assert_eq!(edit_distance("", ""), 0);
    assert_eq!(edit_distance("", "abc"), 3);
    assert_eq!(edit_distance("abc", ""), 3);
    assert_eq!(edit_distance("abc", "abc"), 0);
    assert_eq!(edit_distance("abc", "ab"), 1);
    assert_eq!(edit_distance("abc", "abcd"), 1);
    assert_eq!(edit_distance("kitten", "sitting"), 3);
}

#[test]
fn test_mutation_messages() {
    let ctx = create_test_context(false);
    deadlocked(&ctx);

    let lines = ctx.output.lines();
    assert_eq!(lines[0], "✓ Process P1 added.");
    assert_eq!(lines[2], "✓ Resource R1 added.");
    assert_eq!(lines[4], "✓ Process P1 requested Resource R1.");
    assert_eq!(lines[5], "✓ Resource R1 allocated to Process P2.");
}

#[test]
fn test_json_mutation_message() {
    let ctx = create_test_context(true);
    run(&ctx, &["add-process", "P1"]).unwrap();

    let value: serde_json::Value = serde_json::from_str(&ctx.output.lines()[0]).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["message"], "Process P1 added.");
}

#[test]
fn test_detect_reports_cycle() {
    let ctx = create_test_context(false);
    deadlocked(&ctx);

    assert_eq!(run(&ctx, &["detect"]).unwrap(), Status::Success);
    let lines = ctx.output.lines();
    assert!(lines.contains(&"⚠ Deadlock detected: 1 cycle".to_string()));
    assert!(lines.contains(&"  1. P1 -> R1 -> P2 -> R2 -> P1".to_string()));

    assert_eq!(run(&ctx, &["detect", "--fail-on-deadlock"]).unwrap(), Status::Deadlock);
}

#[test]
fn test_detect_without_deadlock() {
    let ctx = create_test_context(false);
    run(&ctx, &["add-process", "P1"]).unwrap();
    run(&ctx, &["add-resource", "R1"]).unwrap();
    run(&ctx, &["request", "P1", "R1"]).unwrap();

    assert_eq!(run(&ctx, &["detect", "--fail-on-deadlock"]).unwrap(), Status::Success);
    assert_eq!(ctx.output.lines().last().unwrap(), "✓ No deadlock detected.");
}

#[test]
fn test_detect_json() {
    let ctx = create_test_context(true);
    deadlocked(&ctx);
    run(&ctx, &["detect"]).unwrap();

    let value: serde_json::Value = serde_json::from_str(ctx.output.lines().last().unwrap()).unwrap();
    assert_eq!(value["has_deadlock"], true);
    assert_eq!(value["truncated"], false);
    assert_eq!(value["cycles"], serde_json::json!([["P1", "R1", "P2", "R2"]]));
}

#[test]
fn test_detect_truncated() {
    let mut config = test_config();
    config.max_cycles = 1;
    let ctx = CommandContext::with_detector(config, DeadlockDetector::new(), OutputHandler::buffered(false));
    assert_eq!(ctx.detector.limits().max_cycles, 1);

    for p in ["P1", "P2", "P3"] {
        run(&ctx, &["add-process", p]).unwrap();
    }
    run(&ctx, &["add-resource", "R1"]).unwrap();
    run(&ctx, &["add-resource", "R2"]).unwrap();
    // P2 and P3 each close a separate loop through P1
    run(&ctx, &["allocate", "P1", "R1"]).unwrap();
    run(&ctx, &["request", "P2", "R1"]).unwrap();
    run(&ctx, &["request", "P3", "R1"]).unwrap();
    run(&ctx, &["allocate", "P2", "R2"]).unwrap();
    run(&ctx, &["allocate", "P3", "R2"]).unwrap();
    run(&ctx, &["request", "P1", "R2"]).unwrap();

    run(&ctx, &["detect"]).unwrap();
    let lines = ctx.output.lines();
    assert!(lines.contains(&"⚠ Deadlock detected: 1 cycle (list incomplete)".to_string()));
    assert!(lines.last().unwrap().contains("cap of 1 cycles"));
}

#[test]
fn test_graph_formats() {
    let ctx = create_test_context(false);
    run(&ctx, &["graph"]).unwrap();
    assert_eq!(ctx.output.lines(), vec!["Graph is empty."]);

    run(&ctx, &["add-process", "P1"]).unwrap();
    run(&ctx, &["add-resource", "R1"]).unwrap();
    run(&ctx, &["allocate", "P1", "R1"]).unwrap();

    let ctx = CommandContext::with_detector(test_config(), ctx.detector, OutputHandler::buffered(false));
    run(&ctx, &["graph"]).unwrap();
    assert_eq!(
        ctx.output.lines(),
        vec![
            "Nodes (2)",
            "  P1  process",
            "  R1  resource",
            "Edges (1)",
            "  R1 -> P1  allocation",
        ]
    );

    run(&ctx, &["graph", "--format", "json"]).unwrap();
    let value: serde_json::Value = serde_json::from_str(ctx.output.lines().last().unwrap()).unwrap();
    assert_eq!(value["nodes"][1]["kind"], "resource");
    assert_eq!(value["edges"][0]["source"], "R1");

    run(&ctx, &["graph", "--format", "dot"]).unwrap();
    let dot = ctx.output.lines().pop().unwrap();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("shape = box"));
    assert!(dot.contains("allocation"));
}

#[test]
fn test_reset() {
    let ctx = create_test_context(false);
    deadlocked(&ctx);

    run(&ctx, &["reset"]).unwrap();
    assert_eq!(ctx.output.lines().last().unwrap(), "✓ Graph states cleared");
    assert!(ctx.detector.graph_view().is_empty());
}

#[test]
fn test_errors_reach_the_caller() {
    let ctx = create_test_context(false);
    run(&ctx, &["add-process", "P1"]).unwrap();

    let err = run(&ctx, &["add-resource", "P1"]).unwrap_err();
    assert!(matches!(err.downcast_ref::<RagError>(), Some(RagError::DuplicateNode { .. })));

    let err = run(&ctx, &["request", "p1", "R1"]).unwrap_err();
    assert_eq!(did_you_mean(&err, &ctx), Some("did you mean 'P1'?".to_string()));

    let err = run(&ctx, &["request", "P1", "P1"]).unwrap_err();
    assert_eq!(did_you_mean(&err, &ctx), None);
}

#[test]
fn test_json_store_survives_contexts() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config();
    config.store_backend = StoreBackend::Json;
    config.store_path = Utf8PathBuf::try_from(temp_dir.path().join("graph.json")).unwrap();

    {
        let ctx = CommandContext::open(config.clone(), OutputHandler::buffered(false)).unwrap();
        deadlocked(&ctx);
    }

    let ctx = CommandContext::open(config, OutputHandler::buffered(false)).unwrap();
    assert_eq!(ctx.detector.graph_view().nodes.len(), 4);
    assert!(ctx.detector.detect_deadlock().has_deadlock);
}

#[test]
fn test_limits_from_config() {
    assert_eq!(DEFAULT_MAX_CYCLES, rag_graph::cycles::DEFAULT_MAX_CYCLES);
    assert_eq!(limits_from_config(&test_config()), EnumerationLimits::default());

    let mut config = test_config();
    config.max_cycles = 5;
    config.deadline_ms = Some(250);
    let limits = limits_from_config(&config);
    assert_eq!(limits.max_cycles, 5);
    assert_eq!(limits.deadline, Some(Duration::from_millis(250)));
}

#[test]
fn test_cli_overrides() {
    let cli = Cli::try_parse_from(["rag", "--memory", "detect", "--max-cycles", "5", "--deadline-ms", "20"]).unwrap();
    let overrides = crate::cli_overrides(&cli);
    assert_eq!(overrides.get("store-backend").map(String::as_str), Some("memory"));
    assert_eq!(overrides.get("max-cycles").map(String::as_str), Some("5"));
    assert_eq!(overrides.get("deadline-ms").map(String::as_str), Some("20"));

    let cli = Cli::try_parse_from(["rag", "graph", "--store", "g.json"]).unwrap();
    let overrides = crate::cli_overrides(&cli);
    assert_eq!(overrides.get("store-path").map(String::as_str), Some("g.json"));
    assert!(matches!(cli.command, crate::Commands::Graph { format: GraphFormat::Text }));

    assert!(Cli::try_parse_from(["rag", "--memory", "--store", "g.json", "reset"]).is_err());
}

#[test]
fn test_config_sources_are_described() {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    std::fs::write(root.join("rag.toml"), "[detection]\nmax-cycles = 4\n").unwrap();

    let cli = Cli::try_parse_from(["rag", "--memory", "reset"]).unwrap();
    let config = rag_config::ConfigLoader::new(root.clone())
        .with_global_path(None)
        .load(None, Default::default(), crate::cli_overrides(&cli))
        .unwrap();

    let lines: Vec<String> = config.sources.iter().map(crate::describe_source).collect();
    assert_eq!(
        lines,
        vec![
            format!("Loaded project config from {}", root.join("rag.toml")),
            "Applied command-line overrides".to_string(),
        ]
    );
}
