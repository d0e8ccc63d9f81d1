use brandpulse::cli::{Cli, Commands};
use brandpulse::{QueryOptions, SortOrder};
use clap::Parser;

#[test]
fn test_parse_workspaces_json() {
    let cli = Cli::try_parse_from(vec!["brandpulse", "workspaces", "--json"]).unwrap();

    assert!(cli.json);
    assert!(matches!(cli.command, Commands::Workspaces));
}

#[test]
fn test_parse_overview_with_filters() {
    let cli = Cli::try_parse_from(vec![
        "brandpulse",
        "overview",
        "--limit",
        "5",
        "--sort",
        "mentions",
        "--sentiment-min",
        "-20",
        "--sentiment-max",
        "15.5",
    ])
    .unwrap();

    match cli.command {
        Commands::Overview(args) => {
            let options = QueryOptions::from(&args);
            assert_eq!(options.limit, Some(5));
            assert_eq!(options.sort, Some(SortOrder::Mentions));
            assert_eq!(options.sentiment_min, Some(-20.0));
            assert_eq!(options.sentiment_max, Some(15.5));
            assert!(options.since.is_none());
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_detail_by_name_with_window() {
    let cli = Cli::try_parse_from(vec![
        "brandpulse",
        "detail",
        "Brand B",
        "--since",
        "2024-05-01T00:00:00Z",
        "--to",
        "2024-05-03T00:00:00Z",
        "--channel",
        "news",
    ])
    .unwrap();

    match cli.command {
        Commands::Detail(args) => {
            assert_eq!(args.brand, "Brand B");
            let options = QueryOptions::from(&args.query);
            assert_eq!(
                options.since.map(|t| t.to_rfc3339()),
                Some("2024-05-01T00:00:00+00:00".to_string())
            );
            assert_eq!(options.channel.as_deref(), Some("news"));
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_relative_since() {
    let cli = Cli::try_parse_from(vec!["brandpulse", "mentions", "42", "--since", "24h"]).unwrap();

    match cli.command {
        Commands::Mentions(args) => {
            let since = args.query.since.expect("since should parse");
            let age = chrono::Utc::now() - since;
            assert!(age >= chrono::Duration::hours(24));
            assert!(age < chrono::Duration::hours(25));
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_stats_defaults() {
    let cli = Cli::try_parse_from(vec!["brandpulse", "stats", "1", "Brand B"]).unwrap();

    match cli.command {
        Commands::Stats { brands, repeat } => {
            assert_eq!(brands, vec!["1".to_string(), "Brand B".to_string()]);
            assert_eq!(repeat, 2);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_invalid_sort_is_rejected() {
    let result = Cli::try_parse_from(vec!["brandpulse", "overview", "--sort", "alphabetical"]);
    assert!(result.is_err());
}

#[test]
fn test_detail_requires_brand() {
    let result = Cli::try_parse_from(vec!["brandpulse", "detail"]);
    assert!(result.is_err());
}

#[test]
fn test_huge_relative_since_is_rejected() {
    let result = Cli::try_parse_from(vec![
        "brandpulse",
        "mentions",
        "42",
        "--since",
        "9999999999999d",
    ]);
    assert!(result.is_err());
}
