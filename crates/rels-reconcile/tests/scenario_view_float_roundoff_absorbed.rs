//! Float round-off on view properties never shows up as drift.

use rels_reconcile::*;
use rels_testkit::{StaticServer, StaticSpecs};
use serde_json::json;

#[test]
fn float_noise_below_seven_places_matches() {
    let specs = StaticSpecs::new().with_view(json!({
        "name": "Taxa",
        "type": "arangosearch",
        "consolidationIntervalMsec": 1000.00000001,
    }));
    let server = StaticServer::new().with_view(json!({
        "name": "Taxa",
        "type": "arangosearch",
        "consolidationIntervalMsec": 1000.0000000,
    }));

    let outcome = Reconciler::new(&specs, &server).reconcile_views().unwrap();

    assert!(outcome.is_clean(), "unexpected failures: {:?}", outcome.failed);
}

#[test]
fn nested_policy_thresholds_are_rounded() {
    let specs = StaticSpecs::new().with_view(json!({
        "name": "Taxa",
        "type": "arangosearch",
        "consolidationPolicy": {"type": "tier", "minScore": 0, "segmentsBytesFloor": 2097152, "threshold": 0.1},
    }));
    let server = StaticServer::new().with_view(json!({
        "name": "Taxa",
        "type": "arangosearch",
        "consolidationPolicy": {"type": "tier", "minScore": 0, "segmentsBytesFloor": 2097152, "threshold": 0.10000000149011612},
        "writebufferSizeMax": 33554432,
    }));

    let outcome = Reconciler::new(&specs, &server).reconcile_views().unwrap();
    assert!(outcome.is_clean());
    assert_eq!(outcome.server[0]["consolidationPolicy"]["threshold"], json!(0.1));
}

#[test]
fn real_numeric_drift_is_still_reported() {
    let specs = StaticSpecs::new().with_view(json!({
        "name": "Taxa",
        "type": "arangosearch",
        "commitIntervalMsec": 1000,
    }));
    let server = StaticServer::new().with_view(json!({
        "name": "Taxa",
        "type": "arangosearch",
        "commitIntervalMsec": 1000.001,
    }));

    let outcome = Reconciler::new(&specs, &server).reconcile_views().unwrap();
    assert_eq!(outcome.failed, vec!["Taxa/arangosearch".to_string()]);
}

#[test]
fn live_value_just_below_a_rounding_tie_matches_the_lower_spec() {
    let specs = StaticSpecs::new().with_view(json!({"name": "V", "type": "arangosearch", "w": 1.0}));
    let server = StaticServer::new()
        .with_view(json!({"name": "V", "type": "arangosearch", "w": 1.00000005}));

    let outcome = Reconciler::new(&specs, &server).reconcile_views().unwrap();

    assert!(outcome.is_clean(), "unexpected failures: {:?}", outcome.failed);
    assert_eq!(outcome.server[0]["w"], json!(1.0));
}
