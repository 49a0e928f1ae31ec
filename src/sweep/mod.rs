//! Sweep enumeration: the Cartesian product of the swept parameter lists.

use serde::Serialize;

use crate::config::SweepParams;

/// One assignment of values to every swept parameter, plus the scalars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Combination {
    /// 1-based position in launch order.
    pub index: usize,
    pub total: usize,
    pub hello_interval: u64,
    pub mobile_nodes: u32,
    pub propagation_range: f64,
    pub seed: u32,
    pub scenario_side: f64,
    pub simulation_time: f64,
}

impl Combination {
    /// NetAnim trace the simulator writes for this combination. Floating
    /// values carry six decimals, as the simulator formats them.
    pub fn animation_file_name(&self) -> String {
        format!(
            "DisasterRecovery[Nodes={}_Range={:.6}_Side={:.6}_Seed={}_Hello={}].xml",
            self.mobile_nodes, self.propagation_range, self.scenario_side, self.seed, self.hello_interval
        )
    }
}

/// Enumerate combinations in nested order, outermost first: hello interval,
/// mobile nodes, propagation range, seed.
pub fn combinations(params: &SweepParams) -> impl Iterator<Item = Combination> + '_ {
    let total = params.combination_count();
    params
        .hello_intervals
        .iter()
        .flat_map(move |&hello| {
            params.mobile_nodes.iter().flat_map(move |&nodes| {
                params.propagation_ranges.iter().flat_map(move |&range| {
                    params.seeds.iter().map(move |&seed| (hello, nodes, range, seed))
                })
            })
        })
        .enumerate()
        .map(move |(i, (hello_interval, mobile_nodes, propagation_range, seed))| Combination {
            index: i + 1,
            total,
            hello_interval,
            mobile_nodes,
            propagation_range,
            seed,
            scenario_side: params.scenario_side,
            simulation_time: params.simulation_time,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(h: &[u64], n: &[u32], r: &[f64], s: &[u32]) -> SweepParams {
        SweepParams {
            hello_intervals: h.to_vec(),
            mobile_nodes: n.to_vec(),
            propagation_ranges: r.to_vec(),
            seeds: s.to_vec(),
            scenario_side: 500.0,
            simulation_time: 20.0,
        }
    }

    #[test]
    fn launcher_defaults_yield_three_runs_in_node_order() {
        let p = params(&[5000], &[10, 20, 30], &[100.0], &[123456]);
        let combos: Vec<_> = combinations(&p).collect();
        assert_eq!(combos.len(), 3);
        let nodes: Vec<u32> = combos.iter().map(|c| c.mobile_nodes).collect();
        assert_eq!(nodes, vec![10, 20, 30]);
        assert!(combos.iter().all(|c| c.hello_interval == 5000 && c.seed == 123456));
        assert_eq!(combos[2].index, 3);
        assert_eq!(combos[2].total, 3);
    }

    #[test]
    fn nesting_order_is_hello_nodes_range_seed() {
        let p = params(&[1, 2], &[10, 20], &[5.0, 6.0], &[7, 8]);
        let tuples: Vec<_> = combinations(&p)
            .map(|c| (c.hello_interval, c.mobile_nodes, c.propagation_range, c.seed))
            .collect();

        let mut expected: Vec<(u64, u32, f64, u32)> = Vec::new();
        for &h in &[1, 2] {
            for &n in &[10, 20] {
                for &r in &[5.0, 6.0] {
                    for &s in &[7, 8] {
                        expected.push((h, n, r, s));
                    }
                }
            }
        }
        assert_eq!(tuples, expected);
        assert_eq!(tuples.len(), p.combination_count());
    }

    #[test]
    fn count_matches_product_for_uneven_lists() {
        let p = params(&[1000, 2000, 3000], &[5], &[10.0, 20.0], &[1, 2, 3, 4, 5]);
        let combos: Vec<_> = combinations(&p).collect();
        assert_eq!(combos.len(), 30);
        let indexes: Vec<usize> = combos.iter().map(|c| c.index).collect();
        assert_eq!(indexes, (1..=30).collect::<Vec<_>>());
        assert!(combos.iter().all(|c| c.total == 30 && c.scenario_side == 500.0));
    }

    #[test]
    fn empty_list_yields_nothing() {
        let p = params(&[5000], &[], &[100.0], &[1]);
        assert_eq!(combinations(&p).count(), 0);
    }

    #[test]
    fn animation_name_uses_six_decimals_for_floats() {
        let p = params(&[5000], &[20], &[100.0], &[123456]);
        let combo = combinations(&p).next().unwrap();
        assert_eq!(
            combo.animation_file_name(),
            "DisasterRecovery[Nodes=20_Range=100.000000_Side=500.000000_Seed=123456_Hello=5000].xml"
        );
    }
}
