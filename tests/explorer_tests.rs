use pretty_assertions::assert_eq;

use policy_crawler::classify::policy::PolicyClassifier;
use policy_crawler::driver::simulated::{SimScreen, SimulatedApp};
use policy_crawler::error::CrawlError;
use policy_crawler::explorer::algorithm::{self, Algorithm, CrawlSettings, SearchAlgorithm};
use policy_crawler::explorer::frontier::{FrontierConfig, FrontierSearch, Order, SearchOutcome};
use policy_crawler::explorer::randomized::RandomizedSearch;
use policy_crawler::trace::logger::TraceLogger;
use policy_crawler::trace::trace::Decision;

mod common;

use common::{APP, button, label, policy_screen, privacy_link_app, screen, sid, tree_app, window};

fn search(config: FrontierConfig) -> FrontierSearch {
    FrontierSearch::new("test", config, Some(PolicyClassifier::default()))
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| sid(n)).collect()
}

// ============================================================================
// Frontier order
// ============================================================================

#[test]
fn breadth_first_expands_level_by_level() {
    let mut app = tree_app();
    let run = search(FrontierConfig::breadth_first())
        .run(&mut app, &TraceLogger::disabled())
        .unwrap();

    assert_eq!(run.outcome, SearchOutcome::NotFound);
    assert_eq!(run.stats.visited, ids(&["A", "B", "C", "D", "E"]));
    assert_eq!(run.model.screen_count(), 5);
}

#[test]
fn depth_first_follows_first_child() {
    let mut app = tree_app();
    let run = search(FrontierConfig::depth_first())
        .run(&mut app, &TraceLogger::disabled())
        .unwrap();

    assert_eq!(run.stats.visited, ids(&["A", "B", "D", "C", "E"]));
}

#[test]
fn prioritized_order_puts_anchor_pages_first() {
    let mut app = SimulatedApp::new(APP, screen("A", vec![button("B"), button("C")]))
        .screen(screen("B", vec![label("plain")]))
        .screen(screen("C", vec![label("Datenschutz und mehr")]))
        .link(&sid("A"), "B", &sid("B"))
        .link(&sid("A"), "C", &sid("C"));
    let config = FrontierConfig {
        order: Order::Prioritized {
            anchors: vec!["datenschutz".into(), "privacy".into()],
        },
        ..FrontierConfig::breadth_first()
    };

    let run = search(config).run(&mut app, &TraceLogger::disabled()).unwrap();
    assert_eq!(run.stats.visited, ids(&["A", "C", "B"]));
}

#[test]
fn prioritized_order_keeps_anchor_siblings_in_discovery_order() {
    let mut app = SimulatedApp::new(APP, screen("A", vec![button("B"), button("C"), button("D")]))
        .screen(screen("B", vec![label("Privacy notes")]))
        .screen(screen("C", vec![label("Datenschutz")]))
        .screen(screen("D", vec![label("plain")]))
        .link(&sid("A"), "B", &sid("B"))
        .link(&sid("A"), "C", &sid("C"))
        .link(&sid("A"), "D", &sid("D"));
    let config = FrontierConfig {
        order: Order::Prioritized {
            anchors: vec!["datenschutz".into(), "privacy".into()],
        },
        ..FrontierConfig::breadth_first()
    };
    let run = search(config).run(&mut app, &TraceLogger::disabled()).unwrap();

    assert_eq!(run.stats.visited, ids(&["A", "B", "C", "D"]));
}

#[test]
fn expansion_cap_stops_search() {
    let mut app = tree_app();
    let config = FrontierConfig {
        max_expansions: Some(2),
        ..FrontierConfig::breadth_first()
    };
    let run = search(config).run(&mut app, &TraceLogger::disabled()).unwrap();

    assert_eq!(run.outcome, SearchOutcome::NotFound);
    assert_eq!(run.stats.visited, ids(&["A", "B"]));
}

#[test]
fn depth_bound_keeps_deep_pages_out_of_frontier() {
    let mut app = tree_app();
    let config = FrontierConfig {
        max_depth: Some(0),
        ..FrontierConfig::breadth_first()
    };
    let run = search(config).run(&mut app, &TraceLogger::disabled()).unwrap();

    assert_eq!(run.stats.visited, ids(&["A"]));
    // Children are still recorded, just not expanded.
    assert_eq!(run.model.screen_count(), 3);
}

// ============================================================================
// Finding the policy
// ============================================================================

#[test]
fn breadth_first_finds_policy_behind_one_click() {
    let mut app = privacy_link_app();
    let run = search(FrontierConfig::breadth_first())
        .run(&mut app, &TraceLogger::disabled())
        .unwrap();

    match &run.outcome {
        SearchOutcome::Found { page, text } => {
            assert_eq!(page.depth(), 1);
            assert_eq!(page.path()[0].label(), Some("Privacy"));
            assert!(text.starts_with("Privacy Policy\nprivacy"));
        }
        SearchOutcome::NotFound => panic!("policy not found"),
    }
    assert!(app.counters().taps <= 2);
    assert_eq!(app.current(), sid("Policy"));
}

#[test]
fn depth_first_finds_the_same_policy() {
    let mut app = privacy_link_app();
    let run = search(FrontierConfig::depth_first())
        .run(&mut app, &TraceLogger::disabled())
        .unwrap();
    assert!(run.outcome.is_found());
}

#[test]
fn policy_on_start_screen_is_found_without_clicks() {
    let mut app = SimulatedApp::new(APP, policy_screen("Main"));
    let run = search(FrontierConfig::breadth_first())
        .run(&mut app, &TraceLogger::disabled())
        .unwrap();

    assert!(run.outcome.is_found());
    assert_eq!(run.stats.expansions, 0);
    assert_eq!(app.counters().taps, 0);
}

#[test]
fn self_loop_is_not_queued_twice() {
    let mut app = SimulatedApp::new(APP, screen("Main", vec![label("hi"), button("Home")]))
        .link(&sid("Main"), "Home", &sid("Main"));
    let run = search(FrontierConfig::breadth_first())
        .run(&mut app, &TraceLogger::disabled())
        .unwrap();

    assert_eq!(run.stats.visited, ids(&["Main"]));
    assert_eq!(run.model.page_count(), 1);
}

#[test]
fn missing_screen_id_skips_only_that_candidate() {
    let mut app = tree_app().hide_screen_id(&sid("B"));
    let run = search(FrontierConfig::breadth_first())
        .run(&mut app, &TraceLogger::disabled())
        .unwrap();

    // B cannot be identified, its sibling C and everything below C still are.
    assert_eq!(run.outcome, SearchOutcome::NotFound);
    assert_eq!(run.stats.visited, ids(&["A", "C", "E"]));
    assert_eq!(run.stats.candidates, 3);
    assert_eq!(run.stats.failed_candidates, 1);
    assert!(run.model.node(&sid("B")).is_none());
}

#[test]
fn restricted_search_does_not_leave_the_app() {
    let mut app = SimulatedApp::new(APP, screen("Main", vec![button("Share")]))
        .screen(SimScreen::new("com.other.browser/.Web", window(vec![label("elsewhere")])))
        .link(&sid("Main"), "Share", "com.other.browser/.Web");
    let config = FrontierConfig {
        restrict_to_app: true,
        ..FrontierConfig::breadth_first()
    };
    let run = FrontierSearch::new("test", config, None)
        .run(&mut app, &TraceLogger::disabled())
        .unwrap();

    assert_eq!(run.model.screen_count(), 1);
    assert_eq!(run.stats.visited, ids(&["Main"]));
}

#[test]
fn link_to_unknown_screen_is_fatal() {
    let mut app = SimulatedApp::new(APP, screen("Main", vec![button("Broken")]))
        .link(&sid("Main"), "Broken", &sid("Missing"));
    let err = search(FrontierConfig::breadth_first())
        .run(&mut app, &TraceLogger::disabled())
        .unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn extract_model_records_every_screen() {
    let mut app = tree_app();
    let model = algorithm::extract_model(&mut app, None, &TraceLogger::disabled()).unwrap();

    assert_eq!(model.app_id, APP);
    let screens: Vec<&str> = model.nodes.iter().map(|n| n.screen_id.as_str()).collect();
    assert_eq!(screens, vec![sid("A"), sid("B"), sid("C"), sid("D"), sid("E")]);
    assert_eq!(model.page_count(), 5);
}

// ============================================================================
// Randomized search
// ============================================================================

#[test]
fn randomized_search_with_seed_finds_policy() {
    let mut app = SimulatedApp::new(APP, screen("Main", vec![label("hi"), button("Privacy")]))
        .screen(policy_screen("Policy"))
        .link(&sid("Main"), "Privacy", &sid("Policy"));

    let run = RandomizedSearch::new(10, Some(7), PolicyClassifier::default())
        .run(&mut app, &TraceLogger::disabled())
        .unwrap();

    assert!(run.outcome.is_found());
    assert_eq!(run.stats.candidates, 1);
    assert_eq!(run.stats.visited, ids(&["Policy"]));
}

#[test]
fn randomized_search_restarts_when_nothing_is_clickable() {
    let mut app = SimulatedApp::new(APP, screen("Main", vec![label("static")]));

    let run = RandomizedSearch::new(5, Some(1), PolicyClassifier::default())
        .run(&mut app, &TraceLogger::disabled())
        .unwrap();

    assert_eq!(run.outcome, SearchOutcome::NotFound);
    assert_eq!(run.stats.dropped_pages, 5);
    assert_eq!(app.counters().launches, 6);
}

#[test]
fn randomized_search_is_reproducible_with_a_seed() {
    let visited = |seed| {
        let mut app = tree_app();
        RandomizedSearch::new(20, Some(seed), PolicyClassifier::default())
            .run(&mut app, &TraceLogger::disabled())
            .unwrap()
            .stats
            .visited
    };
    assert_eq!(visited(42), visited(42));
}

// ============================================================================
// Algorithm registry
// ============================================================================

#[test]
fn algorithm_labels_parse_case_insensitively() {
    assert_eq!("bfs".parse::<Algorithm>().unwrap(), Algorithm::Bfs);
    assert_eq!("DFS".parse::<Algorithm>().unwrap(), Algorithm::Dfs);
    assert_eq!(" rs ".parse::<Algorithm>().unwrap(), Algorithm::Randomized);
    assert_eq!("Os".parse::<Algorithm>().unwrap(), Algorithm::Optimized);
}

#[test]
fn unknown_algorithm_is_a_configuration_error() {
    let err = "astar".parse::<Algorithm>().unwrap_err();
    assert!(matches!(err, CrawlError::Configuration(_)));
    assert!(err.to_string().contains("astar"));
}

#[test]
fn labels_round_trip_through_display() {
    for algorithm in Algorithm::ALL {
        assert_eq!(algorithm.to_string().parse::<Algorithm>().unwrap(), algorithm);
    }
}

#[test]
fn built_algorithms_carry_their_label() {
    let settings = CrawlSettings::default();
    for algorithm in Algorithm::ALL {
        let built = algorithm.build(&settings).unwrap();
        assert_eq!(built.label(), algorithm.label());
    }
}

#[test]
fn crawl_report_carries_policy_text() {
    let settings = CrawlSettings {
        algorithm: Algorithm::Bfs,
        ..CrawlSettings::default()
    };
    let mut app = privacy_link_app();
    let report = settings
        .algorithm
        .build(&settings)
        .unwrap()
        .crawl(&mut app, &TraceLogger::disabled())
        .unwrap();

    assert_eq!(report.app_id, APP);
    assert_eq!(report.algorithm, "BFS");
    assert!(report.policy_text().is_some_and(|t| t.contains("privacy")));
}

#[test]
fn trace_file_records_decisions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");
    let tracer = TraceLogger::new(path.to_str().unwrap());
    let mut app = privacy_link_app();

    search(FrontierConfig::breadth_first()).run(&mut app, &tracer).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> = content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(events[0]["decision"], "expand");
    assert_eq!(events.last().unwrap()["decision"], "matched");
    let steps: Vec<u64> = events.iter().map(|e| e["step"].as_u64().unwrap()).collect();
    assert!(steps.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn disabled_trace_skips_fingerprints() {
    let snapshot = common::snapshot_of(window(vec![label("Privacy")]));

    let event = TraceLogger::disabled()
        .event("test", APP, Decision::Expand)
        .with_snapshot(&snapshot);
    assert!(!event.is_recorded());
    assert_eq!(event.fingerprint, None);

    let dir = tempfile::tempdir().unwrap();
    let tracer = TraceLogger::new(dir.path().join("trace.jsonl").to_str().unwrap());
    let event = tracer.event("test", APP, Decision::Expand).with_snapshot(&snapshot);
    assert_eq!(event.fingerprint, Some(snapshot.fingerprint()));
}
