//! Unit tests for leo-network.

use std::collections::BTreeMap;

use leo_core::{SatId, SharingPolicy, Tick, UserId};
use leo_trace::Trace;

use crate::{
    harmonic_mean, holt_winters_forecast, BandwidthOracle, NetworkError, SatelliteRegistry,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn trace(series: &[(u32, &[f64])]) -> Trace {
    let len = series[0].1.len();
    let time = (0..len).map(|i| i as f64).collect();
    let bw: BTreeMap<SatId, Vec<f64>> =
        series.iter().map(|(id, s)| (SatId(*id), s.to_vec())).collect();
    Trace::new("test", time, bw).unwrap()
}

fn two_sat_registry() -> SatelliteRegistry {
    let t = trace(&[
        (1, &[5.0, 5.0, 5.0, 5.0, 0.0, 0.0, 5.0, 5.0]),
        (2, &[0.0, 0.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0]),
    ]);
    SatelliteRegistry::from_trace(&t, SharingPolicy::ResourceFair)
}

// ── Occupancy ledger ──────────────────────────────────────────────────────────

#[cfg(test)]
mod occupancy {
    use super::*;

    #[test]
    fn add_counts_from_tick_onward() {
        let mut reg = two_sat_registry();
        reg.add_user(SatId(1), Tick(2), UserId(0)).unwrap();
        assert_eq!(reg.user_count(SatId(1), Tick(1)), 0);
        assert_eq!(reg.user_count(SatId(1), Tick(2)), 1);
        assert_eq!(reg.user_count(SatId(1), Tick(7)), 1);
        assert_eq!(reg.users_at(SatId(1), Tick(3)), vec![UserId(0)]);
    }

    #[test]
    fn remove_without_session_fails() {
        let mut reg = two_sat_registry();
        let err = reg.remove_user(SatId(1), Tick(0), UserId(0)).unwrap_err();
        assert!(matches!(err, NetworkError::NotConnected { .. }));
    }

    #[test]
    fn double_add_fails() {
        let mut reg = two_sat_registry();
        reg.add_user(SatId(1), Tick(0), UserId(0)).unwrap();
        assert!(matches!(
            reg.add_user(SatId(1), Tick(3), UserId(0)),
            Err(NetworkError::AlreadyConnected { .. })
        ));
    }

    #[test]
    fn unknown_satellite_defaults_and_errors() {
        let mut reg = two_sat_registry();
        assert_eq!(reg.user_count(SatId(9), Tick(0)), 0);
        assert_eq!(reg.unshared_rate(SatId(9), Tick(0)), 0.0);
        assert!(matches!(
            reg.add_user(SatId(9), Tick(0), UserId(0)),
            Err(NetworkError::UnknownSatellite(SatId(9)))
        ));
    }

    #[test]
    fn handover_is_paired() {
        let mut reg = two_sat_registry();
        reg.add_user(SatId(1), Tick(0), UserId(0)).unwrap();
        reg.handover(UserId(0), SatId(1), SatId(2), Tick(4)).unwrap();
        assert_eq!(reg.user_count(SatId(1), Tick(3)), 1);
        assert_eq!(reg.user_count(SatId(1), Tick(4)), 0);
        assert_eq!(reg.user_count(SatId(2), Tick(4)), 1);
        assert_eq!(reg.users_at(SatId(1), Tick(3)), vec![UserId(0)]);
        assert!(reg.users_at(SatId(1), Tick(5)).is_empty());
    }

    #[test]
    fn failed_handover_leaves_ledger_untouched() {
        let mut reg = two_sat_registry();
        reg.add_user(SatId(1), Tick(0), UserId(0)).unwrap();
        assert!(reg.handover(UserId(0), SatId(1), SatId(9), Tick(2)).is_err());
        assert!(matches!(
            reg.handover(UserId(0), SatId(1), SatId(1), Tick(2)),
            Err(NetworkError::HandoverToSelf { .. })
        ));
        assert_eq!(reg.user_count(SatId(1), Tick(5)), 1);
    }

    #[test]
    fn occupancy_conservation() {
        let mut reg = two_sat_registry();
        let users = [UserId(0), UserId(1), UserId(2)];
        for u in users {
            reg.add_user(SatId(1), Tick(0), u).unwrap();
        }
        reg.handover(UserId(0), SatId(1), SatId(2), Tick(2)).unwrap();
        reg.handover(UserId(1), SatId(1), SatId(2), Tick(3)).unwrap();
        reg.handover(UserId(0), SatId(2), SatId(1), Tick(5)).unwrap();
        reg.handover(UserId(2), SatId(1), SatId(2), Tick(5)).unwrap();

        for t in 0..8 {
            let t = Tick(t);
            assert_eq!(reg.total_connected(t), users.len(), "at {t}");
            for sat in reg.sat_ids().collect::<Vec<_>>() {
                assert_eq!(reg.user_count(sat, t), reg.users_at(sat, t).len());
            }
        }
        assert_eq!(reg.occupancy_all(Tick(6)), BTreeMap::from([(SatId(1), 1), (SatId(2), 2)]));
    }

    #[test]
    fn remove_before_join_is_empty_session() {
        let mut reg = two_sat_registry();
        reg.add_user(SatId(2), Tick(4), UserId(0)).unwrap();
        reg.remove_user(SatId(2), Tick(1), UserId(0)).unwrap();
        for t in 0..8 {
            assert_eq!(reg.user_count(SatId(2), Tick(t)), 0);
        }
    }
}

// ── Rates ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod rates {
    use super::*;

    #[test]
    fn resource_fair_divides_by_occupancy() {
        let mut reg = two_sat_registry();
        assert_eq!(reg.shared_rate(SatId(1), Tick(0), UserId(0)), 5.0);
        reg.add_user(SatId(1), Tick(0), UserId(0)).unwrap();
        reg.add_user(SatId(1), Tick(0), UserId(1)).unwrap();
        assert_eq!(reg.shared_rate(SatId(1), Tick(0), UserId(0)), 2.5);
        assert!(!reg.is_visible(SatId(1), Tick(4)));
        assert_eq!(reg.visible_at(Tick(4)), vec![SatId(2)]);
    }

    #[test]
    fn ratio_based_uses_stored_shares() {
        let t = trace(&[(1, &[10.0, 10.0, 10.0])]);
        let mut reg = SatelliteRegistry::from_trace(&t, SharingPolicy::RatioBased);
        reg.add_user(SatId(1), Tick(0), UserId(0)).unwrap();
        reg.add_user(SatId(1), Tick(0), UserId(1)).unwrap();
        assert_eq!(reg.shared_rate(SatId(1), Tick(1), UserId(0)), 5.0);
        reg.set_share_ratios(SatId(1), [(UserId(0), 0.8), (UserId(1), 0.2)]).unwrap();
        assert!((reg.shared_rate(SatId(1), Tick(1), UserId(0)) - 8.0).abs() < 1e-12);
        assert!((reg.shared_rate(SatId(1), Tick(1), UserId(1)) - 2.0).abs() < 1e-12);
        reg.clear_share_ratios();
        assert_eq!(reg.shared_rate(SatId(1), Tick(1), UserId(1)), 5.0);
    }
}

// ── Predictors ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod predictors {
    use super::*;

    #[test]
    fn harmonic_mean_of_constant_window() {
        assert_eq!(harmonic_mean(&[10.0; 5]), Some(10.0));
    }

    #[test]
    fn harmonic_not_arithmetic() {
        let h = harmonic_mean(&[5.0, 10.0, 20.0]).unwrap();
        assert!((h - 8.571_428).abs() < 1e-4, "got {h}");
        assert!((h - 11.67).abs() > 1.0);
    }

    #[test]
    fn harmonic_skips_zeros() {
        assert_eq!(harmonic_mean(&[0.0, 0.0, 4.0, 0.0, 4.0]), Some(4.0));
        assert_eq!(harmonic_mean(&[0.0, 0.0]), None);
        assert_eq!(harmonic_mean(&[]), None);
    }

    #[test]
    fn oracle_predicts_harmonic_mean() {
        let t = trace(&[(1, &[10.0; 8])]);
        let reg = SatelliteRegistry::from_trace(&t, SharingPolicy::ResourceFair);
        let mut oracle = BandwidthOracle::new(5);
        let p = oracle.predict(&reg, Some(SatId(1)), UserId(0), Tick(6), false, None);
        assert_eq!(p, 10.0);
        // Perfect past estimate: robust discount is 1 + 0.
        let p = oracle.predict(&reg, Some(SatId(1)), UserId(0), Tick(7), true, None);
        assert_eq!(p, 10.0);
    }

    #[test]
    fn oracle_non_uniform_window() {
        let t = trace(&[(1, &[5.0, 10.0, 20.0, 7.0])]);
        let reg = SatelliteRegistry::from_trace(&t, SharingPolicy::ResourceFair);
        let mut oracle = BandwidthOracle::new(5);
        let p = oracle.predict(&reg, Some(SatId(1)), UserId(0), Tick(3), false, None);
        assert!((p - 8.571_428).abs() < 1e-4);
    }

    #[test]
    fn oracle_edge_cases() {
        let reg = two_sat_registry();
        let mut oracle = BandwidthOracle::new(5);
        assert_eq!(oracle.predict(&reg, None, UserId(0), Tick(3), true, None), 0.0);
        assert_eq!(oracle.predict(&reg, Some(SatId(1)), UserId(0), Tick::ZERO, true, None), 5.0);
        // Past tick invisible: instantaneous rate at ptr.
        assert_eq!(oracle.predict(&reg, Some(SatId(2)), UserId(0), Tick(2), true, None), 3.0);
        assert_eq!(oracle.estimate_count(UserId(0), SatId(2)), 0);
    }

    #[test]
    fn robust_discount_uses_recorded_error() {
        let t = trace(&[(1, &[10.0, 10.0, 10.0, 5.0, 5.0])]);
        let reg = SatelliteRegistry::from_trace(&t, SharingPolicy::ResourceFair);
        let mut oracle = BandwidthOracle::new(3);
        // Estimate at tick 3 over [0, 3) is 10.
        oracle.predict(&reg, Some(SatId(1)), UserId(0), Tick(3), false, None);
        // Observed 5 at tick 3: error |10 - 5| / 5 = 1.
        let raw = oracle.predict(&reg, Some(SatId(1)), UserId(0), Tick(4), false, None);
        let robust = oracle.predict(&reg, Some(SatId(1)), UserId(0), Tick(4), true, None);
        assert!((robust - raw / 2.0).abs() < 1e-9, "raw {raw}, robust {robust}");
    }

    #[test]
    fn lookback_warms_history() {
        let t = trace(&[(1, &[10.0; 12])]);
        let reg = SatelliteRegistry::from_trace(&t, SharingPolicy::ResourceFair);
        let mut oracle = BandwidthOracle::new(5);
        oracle.predict(&reg, Some(SatId(1)), UserId(0), Tick(10), true, Some(8));
        // Warm-up at ticks 2..=8 plus the prediction itself.
        assert_eq!(oracle.estimate_count(UserId(0), SatId(1)), 8);
    }

    #[test]
    fn shared_prediction_divides_by_occupancy() {
        let mut reg = two_sat_registry();
        let mut oracle = BandwidthOracle::new(5);
        reg.add_user(SatId(2), Tick(0), UserId(1)).unwrap();
        let p = oracle.predict_shared(&reg, SatId(2), UserId(0), Tick(6), false, None);
        assert_eq!(p, 3.0);
        reg.add_user(SatId(2), Tick(0), UserId(2)).unwrap();
        let p = oracle.predict_shared(&reg, SatId(2), UserId(0), Tick(6), false, None);
        assert_eq!(p, 1.5);
        assert_eq!(oracle.predict_shared(&reg, SatId(1), UserId(0), Tick(4), false, None), 0.0);
    }

    #[test]
    fn holt_winters_degenerate_inputs() {
        assert_eq!(holt_winters_forecast(&[]), None);
        assert_eq!(holt_winters_forecast(&[4.0]), Some(4.0));
        assert_eq!(holt_winters_forecast(&[0.0, 0.0, 3.0]), Some(3.0));
    }

    #[test]
    fn holt_winters_follows_linear_trend() {
        let f = holt_winters_forecast(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((f - 6.0).abs() < 1e-9, "got {f}");
        let f = holt_winters_forecast(&[8.0; 6]).unwrap();
        assert!((f - 8.0).abs() < 1e-9);
    }
}
