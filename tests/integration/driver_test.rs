use pretty_assertions::assert_eq;
use reactive_list_bench::bench::{BenchConfig, BenchmarkDriver, Phase, PhaseFilter};
use reactive_list_bench::component::PropValue;
use reactive_list_bench::core::timing::EntryType;
use reactive_list_bench::fixtures::{X_APP, X_ITEM, X_THING};
use reactive_list_bench::{format_measure, BenchError, PhaseRun, UpdateError};
use tokio::task::LocalSet;

fn config(filter: PhaseFilter, list_len: usize) -> BenchConfig {
    BenchConfig {
        filter,
        list_len,
        ..BenchConfig::default()
    }
}

#[tokio::test]
async fn test_render_phase_only() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::from_query("?benchmark=render"), 250)).unwrap();
            let measures = driver.run().await.unwrap();

            assert_eq!(measures.len(), 1);
            assert_eq!(measures[0].name, "render");
            assert_eq!(measures[0].entry_type, EntryType::Measure);
            assert!(measures[0].duration > 0.0);
            assert!(format_measure(&measures[0]).starts_with("render: "));
        })
        .await;
}

#[tokio::test]
async fn test_render_waits_for_the_whole_tree() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::all(), 250)).unwrap();
            let run = driver.run_phase(Phase::Render).await.unwrap();

            assert_eq!(run.settles.len(), 1);
            assert_eq!(run.settles[0].completions, 1 + 7 * 250);
        })
        .await;
}

#[tokio::test]
async fn test_every_swap_settles_the_full_list() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::all(), 250)).unwrap();
            let root = driver.mount().create(X_APP).unwrap();
            let document = driver.runtime().document().clone();

            for i in 0..driver.config().update_count {
                let list = driver.datasets().for_iteration(i).clone();
                root.set_property("items", PropValue::List(list)).unwrap();
                let report = driver.tracker().settle().await.unwrap();

                assert_eq!(report.completions, 1 + 7 * 250, "iteration {i}");
                assert_eq!(document.get_elements_by_tag_name(X_ITEM).len(), 250);
                assert_eq!(document.get_elements_by_tag_name(X_THING).len(), 1500);
                assert_eq!(driver.tracker().pending(), 0);
            }

            // Odd iterations hand out the second dataset.
            let first_leaf = &root.children()[0].children()[0];
            assert_eq!(document.text_content(first_leaf.node()), "250: 0250: 1250: 2");
        })
        .await;
}

#[tokio::test]
async fn test_update_phase() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::only("update"), 40)).unwrap();
            let measures = driver.run().await.unwrap();

            assert_eq!(measures.len(), 1);
            assert_eq!(measures[0].name, "update");
            assert!(measures[0].duration > 0.0);
        })
        .await;
}

#[tokio::test]
async fn test_update_reflect_mirrors_properties_to_attributes() {
    LocalSet::new()
        .run_until(async {
            let plain = BenchmarkDriver::new(config(PhaseFilter::all(), 10)).unwrap();
            let plain_run = plain.run_phase(Phase::Update).await.unwrap();
            let plain_attributes = plain.runtime().document().mutation_stats().attributes;

            let reflecting = BenchmarkDriver::new(config(PhaseFilter::all(), 10)).unwrap();
            let reflect_run = reflecting.run_phase(Phase::UpdateReflect).await.unwrap();
            let reflect_attributes = reflecting.runtime().document().mutation_stats().attributes;

            let completions = |run: &PhaseRun| {
                run.settles.iter().map(|s| s.completions).collect::<Vec<_>>()
            };
            assert_eq!(completions(&reflect_run), completions(&plain_run));
            assert_eq!(completions(&plain_run), vec![1 + 7 * 10; 6]);
            assert!(reflect_attributes > plain_attributes);
            assert!(!reflecting.runtime().reflect().is_enabled());
        })
        .await;
}

#[tokio::test]
async fn test_unknown_phase_records_nothing() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::only("paint"), 5)).unwrap();
            let measures = driver.run().await.unwrap();
            assert!(measures.is_empty());
            assert!(driver.mount().is_empty());
        })
        .await;
}

#[tokio::test]
async fn test_all_phases_run_in_order() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::all(), 8)).unwrap();
            let measures = driver.run().await.unwrap();

            let names: Vec<&str> = measures.iter().map(|m| m.name.as_str()).collect();
            assert_eq!(names, vec!["render", "update", "update-reflect"]);
            assert_eq!(driver.performance().entries_by_type(EntryType::Mark).len(), 3);
        })
        .await;
}

#[tokio::test]
async fn test_run_leaves_no_residue() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::all(), 8)).unwrap();
            let baseline = driver.runtime().document().node_count();
            driver.run().await.unwrap();

            assert_eq!(driver.tracker().pending(), 0);
            assert!(driver.mount().is_empty());
            assert_eq!(driver.runtime().document().node_count(), baseline);
            assert_eq!(driver.runtime().scheduler().pending(), 0);
        })
        .await;
}

#[tokio::test]
async fn test_mistyped_list_fails_the_wait() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::all(), 3)).unwrap();
            let root = driver.mount().create(X_APP).unwrap();

            // Accepted on assignment, rejected when the list renders.
            assert!(root.set_property("items", PropValue::text("not a list")).unwrap());
            let err = BenchError::from(driver.tracker().settle().await.unwrap_err());
            assert!(matches!(err, BenchError::Update(UpdateError::Render { .. })));
        })
        .await;
}

#[tokio::test]
async fn test_failing_phase_turns_reflection_off() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::all(), 3)).unwrap();
            // An x-item without a record cannot render.
            driver.mount().create(X_ITEM).unwrap();

            let err = driver.run_phase(Phase::UpdateReflect).await.unwrap_err();

            assert!(matches!(err, BenchError::Update(UpdateError::Render { ref tag, .. }) if tag == X_ITEM));
            assert!(!driver.runtime().reflect().is_enabled());
            assert_eq!(driver.mount().len(), 2);
        })
        .await;
}

#[tokio::test]
async fn test_failure_aborts_remaining_phases() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::all(), 3)).unwrap();
            driver.mount().create(X_ITEM).unwrap();

            let err = driver.run().await.unwrap_err();

            assert!(matches!(err, BenchError::Update(UpdateError::Render { .. })));
            assert!(driver.performance().entries_by_type(EntryType::Measure).is_empty());
            assert!(!driver.runtime().reflect().is_enabled());
        })
        .await;
}

#[tokio::test]
async fn test_repeated_runs_report_their_own_measures() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::all(), 4)).unwrap();
            let first = driver.run().await.unwrap();
            let second = driver.run().await.unwrap();

            assert_eq!(first.len(), 3);
            assert_eq!(second.len(), 3);
            assert!(second.iter().zip(&first).all(|(a, b)| a.start_time > b.start_time));
        })
        .await;
}

#[tokio::test]
async fn test_json_report_carries_document_metrics() {
    LocalSet::new()
        .run_until(async {
            let driver = BenchmarkDriver::new(config(PhaseFilter::only("render"), 4)).unwrap();
            let measures = driver.run().await.unwrap();
            let report = driver.report(&measures);

            assert_eq!(report["measures"].as_array().map(Vec::len), Some(1));
            assert_eq!(report["measures"][0]["name"], "render");
            assert_eq!(report["measures"][0]["entry_type"], "measure");
            // Only the root, body and mount container survive the unmount.
            assert_eq!(report["document"]["node_count"], 3);
            assert!(report["document"]["mutations"]["child_list"].as_u64().unwrap() > 0);
        })
        .await;
}

#[test]
fn test_oversized_list_is_rejected() {
    let result = BenchmarkDriver::new(config(PhaseFilter::all(), usize::MAX));
    assert!(matches!(result, Err(BenchError::Config(_))));
}
