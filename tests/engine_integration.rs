//! End-to-end runs of the consensus engine over real job archives

mod common;

use common::TestSite;
use mask_consensus::mask::{Shape, UNVOTED};
use mask_consensus::engine::RunPhase;
use mask_consensus::mask::SkipReason;
use mask_consensus::store::{LocationLock, COMBINED_DIR};
use mask_consensus::{CombineRequest, ErrorCode};
use serde_json::json;
use tokio_util::sync::CancellationToken;

async fn combine(site: &TestSite, request: CombineRequest) -> mask_consensus::Result<mask_consensus::RunReport> {
    site.engine()
        .combine(&request, &CancellationToken::new())
        .await
}

#[tokio::test]
async fn test_two_jobs_resolve_to_majority() {
    let site = TestSite::new();
    site.add_job("a", "12", "2020-06-01", &json!({"3": [[1, -1], [0, -1]]}));
    site.add_job("b", "12", "2020-06-01", &json!({"3": [[1, 1], [0, -1]]}));

    let report = combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap();

    assert_eq!(report.new_jobs, 2);
    assert_eq!(report.total_jobs, 2);
    assert_eq!(report.sources, 2);
    assert_eq!(report.classes, vec!["3"]);
    assert_eq!(report.shape, Shape::new(2, 2));
    assert!(report.skipped_datasets.is_empty());

    assert_eq!(site.grid("12", "3"), vec![vec![1, 1], vec![0, -1]]);

    let state = site.store().load("12").unwrap();
    assert_eq!(state.metadata.jobs, 2);
    assert_eq!(
        state.metadata.classes.into_iter().collect::<Vec<_>>(),
        vec!["3"]
    );
    assert_eq!(state.metadata.shape, Some(Shape::new(2, 2)));
}

#[tokio::test]
async fn test_prior_consensus_votes_once_in_next_run() {
    let site = TestSite::new();
    site.add_job("a", "12", "2020-06-01", &json!({"3": [[1, -1], [0, -1]]}));
    site.add_job("b", "12", "2020-06-01", &json!({"3": [[1, 1], [0, -1]]}));
    combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap();

    // Prior [[1, 1], [0, -1]] plus normalized [[0, 0], [1, 1]]
    site.add_job("c", "12", "2020-06-02", &json!({"3": [[-1, -1], [1, 1]]}));
    let report = combine(&site, CombineRequest::new("12", "2020-06-02"))
        .await
        .unwrap();

    assert_eq!(report.new_jobs, 1);
    assert_eq!(report.total_jobs, 3);
    assert_eq!(report.sources, 2);
    assert_eq!(site.grid("12", "3"), vec![vec![1, 1], vec![1, -1]]);
}

#[tokio::test]
async fn test_job_count_grows_on_every_run() {
    let site = TestSite::new();
    site.add_job("a", "12", "2020-06-01", &json!({"3": [[1]]}));
    site.add_job("b", "12", "2020-06-01", &json!({"3": [[1]]}));

    let first = combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap();
    let empty = combine(&site, CombineRequest::new("12", "2020-07-01"))
        .await
        .unwrap();
    let again = combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap();

    assert_eq!(first.total_jobs, 2);
    assert_eq!(empty.new_jobs, 0);
    assert_eq!(empty.total_jobs, 2);
    assert_eq!(again.total_jobs, 4);
}

#[tokio::test]
async fn test_shape_mismatch_leaves_consensus_untouched() {
    let site = TestSite::new();
    site.add_job("a", "12", "2020-06-01", &json!({"3": [[1, 1], [0, 0]]}));
    combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap();
    let before = site.store().load("12").unwrap();

    site.add_job(
        "b",
        "12",
        "2020-06-02",
        &json!({"3": [[1, 1, 1], [1, 1, 1], [1, 1, 1]]}),
    );
    let err = combine(&site, CombineRequest::new("12", "2020-06-02"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AGG_SHAPE_MISMATCH);

    let after = site.store().load("12").unwrap();
    assert_eq!(after.snapshot, before.snapshot);
    assert_eq!(after.metadata.jobs, 1);
    assert_eq!(site.grid("12", "3"), vec![vec![1, 1], vec![0, 0]]);
}

#[tokio::test]
async fn test_non_rectangular_dataset_is_skipped() {
    let site = TestSite::new();
    site.add_job(
        "a",
        "12",
        "2020-06-01",
        &json!({"3": [[1, 1], [0, -1]], "5": [[[1, 1], [1, 1]], [[1, 1], [1, 1]]]}),
    );

    let report = combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap();

    assert_eq!(report.classes, vec!["3"]);
    assert_eq!(report.skipped_datasets.len(), 1);
    assert_eq!(report.skipped_datasets[0].class, "5");
    assert_eq!(site.grid("12", "3"), vec![vec![1, 1], vec![0, -1]]);
}

#[tokio::test]
async fn test_no_jobs_and_no_prior_mask_is_fatal() {
    let site = TestSite::new();
    let err = combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AGG_NO_SHAPE);
    assert!(site.store().load("12").unwrap().snapshot.is_none());
    assert!(!site.path().join("12").exists());
}

#[tokio::test]
async fn test_no_shape_keeps_existing_source_dir() {
    let site = TestSite::new();
    site.add_archive("a", "12", "2020-06-01", &[("notes.txt", &b"no mask"[..])]);

    let err = combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AGG_NO_SHAPE);
    assert!(site.path().join("12").is_dir());
    assert!(!site.path().join("12").join(COMBINED_DIR).exists());
}

#[tokio::test]
async fn test_empty_datasets_do_not_fix_the_shape() {
    let site = TestSite::new();
    site.add_job(
        "a",
        "12",
        "2020-06-01",
        &json!({"0": [], "1": [[]], "3": [[1, 1], [0, -1]]}),
    );

    let report = combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap();
    assert_eq!(report.shape, Shape::new(2, 2));
    assert_eq!(report.classes, vec!["3"]);
    let reasons: Vec<_> = report
        .skipped_datasets
        .iter()
        .map(|s| (s.class.as_str(), s.reason.clone()))
        .collect();
    assert_eq!(reasons, vec![("0", SkipReason::Empty), ("1", SkipReason::Empty)]);
    assert_eq!(site.grid("12", "3"), vec![vec![1, 1], vec![0, -1]]);
}

#[tokio::test]
async fn test_only_empty_datasets_leave_shape_unknown() {
    let site = TestSite::new();
    site.add_job("a", "12", "2020-06-01", &json!({"0": [[]]}));
    let err = combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AGG_NO_SHAPE);
    assert!(site.store().load("12").unwrap().metadata.shape.is_none());

    // A later date with a real mask still fixes the shape
    site.add_job("b", "12", "2020-06-02", &json!({"3": [[1, 1], [0, -1]]}));
    let report = combine(&site, CombineRequest::new("12", "2020-06-02"))
        .await
        .unwrap();
    assert_eq!(report.shape, Shape::new(2, 2));
}

#[tokio::test]
async fn test_cancel_mid_run_publishes_nothing() {
    let site = TestSite::new();
    site.add_job("a", "12", "2020-06-01", &json!({"3": [[1, 1], [0, 0]]}));
    combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap();
    let before = site.store().load("12").unwrap();
    let live = before.snapshot.clone().unwrap();

    for (i, prefix) in ["b", "c", "d", "e", "f", "g", "h", "i"].iter().enumerate() {
        let mask = if i % 2 == 0 {
            json!({"3": [[-1, -1], [1, 1]]})
        } else {
            json!({"3": [[1, -1], [1, -1]]})
        };
        site.add_job(prefix, "12", "2020-06-02", &mask);
    }

    for stop_at in [
        RunPhase::Aggregate,
        RunPhase::Resolve,
        RunPhase::Write,
        RunPhase::PersistMetadata,
    ] {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let err = site
            .engine()
            .combine_with_progress(
                &CombineRequest::new("12", "2020-06-02"),
                &cancel,
                move |phase| {
                    if phase == stop_at {
                        trigger.cancel();
                    }
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_cancelled(), "cancel at {}: {}", stop_at, err);

        let after = site.store().load("12").unwrap();
        assert_eq!(after.snapshot, before.snapshot);
        assert_eq!(after.metadata, before.metadata);
        assert_eq!(site.grid("12", "3"), vec![vec![1, 1], vec![0, 0]]);

        let mut entries: Vec<String> = std::fs::read_dir(site.store().location_dir("12"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["CURRENT".to_string(), live.clone()]);
    }
}

#[tokio::test]
async fn test_archive_without_mask_is_not_counted() {
    let site = TestSite::new();
    site.add_archive("a", "12", "2020-06-01", &[("notes.txt", &b"nothing here"[..])]);
    site.add_job("b", "12", "2020-06-01", &json!({"3": [[1]]}));

    let report = combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap();
    assert_eq!(report.new_jobs, 1);
}

#[tokio::test]
async fn test_result_is_independent_of_archive_order() {
    let masks = [
        json!({"1": [[1, 0, -1]], "2": [[-1, -1, 0]]}),
        json!({"1": [[1, -1, -1]], "2": [[1, 0, 0]]}),
        json!({"1": [[-1, 0, 1]], "2": [[1, 1, -1]]}),
    ];
    let orders = [[0, 1, 2], [2, 0, 1], [1, 2, 0]];

    let mut results = Vec::new();
    for order in orders {
        let site = TestSite::new();
        for (prefix, &index) in ["a", "b", "c"].iter().zip(order.iter()) {
            site.add_job(prefix, "12", "2020-06-01", &masks[index]);
        }
        combine(&site, CombineRequest::new("12", "2020-06-01"))
            .await
            .unwrap();
        results.push((site.grid("12", "1"), site.grid("12", "2")));
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
    assert_eq!(results[0].0, vec![vec![1, 0, 1]]);
}

#[tokio::test]
async fn test_requested_class_without_votes_is_unvoted() {
    let site = TestSite::new();
    site.add_job("a", "12", "2020-06-01", &json!({"3": [[1, 0]]}));

    let report = combine(
        &site,
        CombineRequest::new("12", "2020-06-01").with_classes(["3", "9"]),
    )
    .await
    .unwrap();

    assert_eq!(report.classes, vec!["3", "9"]);
    assert_eq!(site.grid("12", "9"), vec![vec![UNVOTED, UNVOTED]]);

    // The unvoted class casts no votes when the mask is fed back in
    site.add_job("b", "12", "2020-06-02", &json!({"9": [[1, -1]]}));
    combine(&site, CombineRequest::new("12", "2020-06-02"))
        .await
        .unwrap();
    assert_eq!(site.grid("12", "9"), vec![vec![1, -1]]);
}

#[tokio::test]
async fn test_busy_location_is_refused() {
    let site = TestSite::new();
    site.add_job("a", "12", "2020-06-01", &json!({"3": [[1]]}));
    let _held = LocationLock::acquire(&site.store().location_dir("12"), "12").unwrap();

    let err = combine(&site, CombineRequest::new("12", "2020-06-01"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::STORE_LOCK_BUSY);
}

#[tokio::test]
async fn test_output_root_separate_from_sources() {
    let site = TestSite::new();
    let out = tempfile::TempDir::new().unwrap();
    site.add_job("a", "12", "2020-06-01", &json!({"3": [[1]]}));

    let engine = mask_consensus::Engine::new(mask_consensus::EngineConfig {
        output_root: Some(out.path().to_path_buf()),
        ..site.config()
    })
    .unwrap();
    engine
        .combine(
            &CombineRequest::new("12", "2020-06-01"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(engine.store().load("12").unwrap().snapshot.is_some());
    assert!(site.store().load("12").unwrap().snapshot.is_none());
}
