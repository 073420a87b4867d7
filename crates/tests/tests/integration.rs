//! End-to-end tests for the classical hazard pipeline.
//!
//! These exercise the full flow: partition → block tasks → reduction →
//! realization combination → statistics → maps/UHS, and the tiled variant
//! of the same pipeline.

use approx::assert_abs_diff_eq;
use seisma_tests::Scenario;

fn assert_curves_eq(a: &ndarray::Array2<f64>, b: &ndarray::Array2<f64>) {
    assert_abs_diff_eq!(
        a.as_slice().unwrap(),
        b.as_slice().unwrap(),
        epsilon = 1e-12
    );
}

#[test]
fn test_classical_end_to_end() {
    let scenario = Scenario::two_trt(12);
    let result = scenario.run_classical(2).unwrap();

    let rlz_curves = result.curves_by_rlz.as_ref().unwrap();
    assert_eq!(rlz_curves.len(), 3);
    let (n_sites, n_levels) = rlz_curves[0].dim();
    assert_eq!(n_sites, 12);
    assert_eq!(n_levels, scenario.params.imtls.total_levels());

    // probabilities stay in [0, 1] and curves decrease along each IMT's
    // level range
    for curves in rlz_curves {
        for &p in curves.iter() {
            assert!((0.0..=1.0).contains(&p), "probability {p} out of range");
        }
        for (_imt, _levels, range) in scenario.params.imtls.iter() {
            for site in 0..n_sites {
                let row = curves.row(site);
                for j in range.clone().skip(1) {
                    assert!(row[j] <= row[j - 1], "curve not monotone at level {j}");
                }
            }
        }
    }

    assert!(result.mean_curves.is_some());
    assert_eq!(result.quantile_curves.len(), 2);
    assert_eq!(result.source_info.len(), scenario.sources.len());

    // hazard maps: (sites, imts, poes); UHS periods ascending with PGA at 0
    let maps = result.hazard_maps.as_ref().unwrap();
    assert_eq!(maps.dim(), (12, 3, 2));
    let uhs = result.uhs.as_ref().unwrap();
    assert_eq!(uhs.periods, vec![0.0, 0.2, 1.0]);
    assert_eq!(uhs.spectra.dim(), (12, 2, 3));
    // a rarer poe maps to an equal or higher intensity level
    for site in 0..12 {
        for imt in 0..3 {
            assert!(maps[[site, imt, 1]] >= maps[[site, imt, 0]]);
        }
    }
}

#[test]
fn test_task_count_does_not_change_result() {
    let scenario = Scenario::two_trt(9);
    let reference = scenario.run_classical(1).unwrap();
    for tasks in [2, 3, 8] {
        let result = scenario.run_classical(tasks).unwrap();
        assert_curves_eq(
            result.mean_curves.as_ref().unwrap(),
            reference.mean_curves.as_ref().unwrap(),
        );
        for (rlz, reference_rlz) in result
            .curves_by_rlz
            .as_ref()
            .unwrap()
            .iter()
            .zip(reference.curves_by_rlz.as_ref().unwrap())
        {
            assert_curves_eq(rlz, reference_rlz);
        }
    }
}

#[test]
fn test_tiling_equivalence() {
    let scenario = Scenario::two_trt(10);
    let plain = scenario.run_classical(1).unwrap();
    for tiles in [1, 2, 5] {
        let tiled = scenario.run_tiled(tiles).unwrap();
        assert_curves_eq(
            tiled.mean_curves.as_ref().unwrap(),
            plain.mean_curves.as_ref().unwrap(),
        );
        for ((q_t, tiled_q), (q_p, plain_q)) in
            tiled.quantile_curves.iter().zip(&plain.quantile_curves)
        {
            assert_eq!(q_t, q_p);
            assert_curves_eq(tiled_q, plain_q);
        }
        let maps_t = tiled.hazard_maps.as_ref().unwrap();
        let maps_p = plain.hazard_maps.as_ref().unwrap();
        assert_abs_diff_eq!(
            maps_t.as_slice().unwrap(),
            maps_p.as_slice().unwrap(),
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_disaggregation_bounding_boxes() {
    let mut scenario = Scenario::two_trt(6);
    scenario.params.poes_disagg = true;
    let result = scenario.run_classical(2).unwrap();

    // one box per (source model, site); the single source model is 0
    assert_eq!(result.bb_map.len(), 6);
    for (&(sm, _site), bb) in &result.bb_map {
        assert_eq!(sm, 0);
        assert!(!bb.is_empty());
        let edges = bb.bins_edges(20.0, 0.5).unwrap();
        assert!(edges.dist_edges.len() >= 2);
        assert!(edges.lon_edges.len() >= 2);
        assert!(edges.lat_edges.len() >= 2);
    }

    // boxes off means no boxes collected
    scenario.params.poes_disagg = false;
    let result = scenario.run_classical(2).unwrap();
    assert!(result.bb_map.is_empty());
}

#[test]
fn test_accumulator_effective_trts() {
    let scenario = Scenario::two_trt(4);
    let acc = scenario.execute_classical(2).unwrap();
    assert!(acc.is_effective(&"active shallow crust".into()));
    assert!(acc.is_effective(&"stable continental".into()));
    assert!(!acc.is_effective(&"subduction".into()));
}

#[test]
fn test_source_info_sorted_by_cost() {
    let scenario = Scenario::two_trt(8);
    let result = scenario.run_classical(3).unwrap();
    let secs: Vec<f64> = result.source_info.iter().map(|t| t.seconds).collect();
    assert!(secs.windows(2).all(|w| w[0] >= w[1]));
}
