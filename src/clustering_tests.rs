#[cfg(test)]
mod tests {
    use crate::cluster::{
        cluster, Checker, ClusterSet, CompleteLinkage, DistanceMap, HierarchicalClustering,
        LanceWilliams, Linkage, MaxClusters, Merge, Method, Threshold, TreeLog,
    };
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;
    use std::collections::BTreeSet;
    use std::hash::Hash;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn five_items() -> DistanceMap<&'static str> {
        DistanceMap::new([
            ("a", vec![("b", 0.0), ("c", 0.0), ("d", 1.0), ("e", 0.4)]),
            ("b", vec![("c", 0.1), ("d", 0.9), ("e", 0.4)]),
            ("c", vec![("d", 0.9), ("e", 0.2)]),
            ("d", vec![("e", 0.1)]),
        ])
    }

    fn partition<T: Ord + Hash + Clone>(set: &DistanceMap<T>) -> BTreeSet<BTreeSet<T>> {
        set.clusters()
            .iter()
            .map(|c| c.iter().cloned().collect())
            .collect()
    }

    fn group<'a>(items: &[&'a str]) -> BTreeSet<&'a str> {
        items.iter().copied().collect()
    }

    /// Clusters points on a line, keeping the higher index of a merged pair
    /// whenever it can and moving the last cluster into the lower one.
    #[derive(Debug, Clone)]
    struct LineSet {
        clusters: Vec<Vec<i64>>,
    }

    impl LineSet {
        fn new(points: impl IntoIterator<Item = i64>) -> Self {
            Self {
                clusters: points.into_iter().map(|p| vec![p]).collect(),
            }
        }
    }

    impl ClusterSet for LineSet {
        type Item = i64;

        fn count(&self) -> usize {
            self.clusters.len()
        }

        fn each_cluster(&self, start: Option<usize>, visit: &mut dyn FnMut(usize)) {
            for c in start.map_or(0, |s| s + 1)..self.clusters.len() {
                visit(c);
            }
        }

        fn each_item(&self, cluster: usize, visit: &mut dyn FnMut(&i64)) {
            for x in &self.clusters[cluster] {
                visit(x);
            }
        }

        fn distance(&self, _c1: usize, _c2: usize, a: &i64, b: &i64) -> f64 {
            (a - b).abs() as f64
        }

        fn merge(&mut self, i: usize, j: usize) -> Merge {
            let (lo, hi) = (i.min(j), i.max(j));
            let last = self.clusters.len() - 1;
            if hi == last {
                let moved = self.clusters.pop().unwrap();
                self.clusters[lo].extend(moved);
                Merge {
                    kept: lo,
                    swapped_in: last,
                }
            } else {
                let moved = self.clusters.swap_remove(lo);
                self.clusters[hi].extend(moved);
                Merge {
                    kept: hi,
                    swapped_in: last,
                }
            }
        }
    }

    /// Counts resets and optionally hides the recurrence of `inner`.
    struct Probe<L> {
        inner: L,
        resets: usize,
        recurrence: bool,
    }

    impl<L> Probe<L> {
        fn new(inner: L, recurrence: bool) -> Self {
            Self {
                inner,
                resets: 0,
                recurrence,
            }
        }
    }

    impl<T: ?Sized, L: Linkage<T>> Linkage<T> for Probe<L> {
        fn reset(&mut self) {
            self.resets += 1;
            self.inner.reset();
        }

        fn put(&mut self, item1: &T, item2: &T, dist: f64) {
            self.inner.put(item1, item2, dist);
        }

        fn get(&self) -> f64 {
            self.inner.get()
        }

        fn lance_williams(&self, size_i: usize, size_j: usize) -> Option<LanceWilliams> {
            if self.recurrence {
                self.inner.lance_williams(size_i, size_j)
            } else {
                None
            }
        }
    }

    /// Walks a full run, checking after every merge that each cached score
    /// equals a from-scratch score over the same membership.
    fn check_cache_against_scratch<S>(set: &mut S, method: Method) -> Result<(), TestCaseError>
    where
        S: ClusterSet + Clone,
    {
        let mut hc = HierarchicalClustering::new(set, MaxClusters(1), method.linkage());
        loop {
            let n = hc.clusters().count();
            let mut snapshot = hc.clusters().clone();
            let mut scratch =
                HierarchicalClustering::new(&mut snapshot, MaxClusters(1), method.linkage())
                    .with_incremental(false);
            for i in 0..n {
                for j in (i + 1)..n {
                    let cached = hc.distance(i, j);
                    let fresh = scratch.distance(i, j);
                    prop_assert!(
                        (cached - fresh).abs() <= 1e-9 * fresh.abs().max(1.0),
                        "{method} after {} merges: d({i},{j}) cached {cached} vs fresh {fresh}",
                        hc.merges()
                    );
                }
            }
            if !hc.merge_next() {
                break;
            }
        }
        prop_assert_eq!(hc.clusters().count(), 1);
        Ok(())
    }

    /// Linkages whose cached scores are the item-level score of the merged
    /// membership. WPGMA scores come from the recurrence alone and drift from
    /// the item mean once a multi-item cluster merges again.
    fn item_defined_methods() -> impl Iterator<Item = Method> {
        Method::ALL.into_iter().filter(|m| *m != Method::Weighted)
    }

    fn distance_rows(n: usize, condensed: &[Option<f64>]) -> Vec<(usize, Vec<(usize, f64)>)> {
        let mut k = 0;
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            let mut row = Vec::new();
            for j in (i + 1)..n {
                if let Some(d) = condensed[k] {
                    row.push((j, d));
                }
                k += 1;
            }
            rows.push((i, row));
        }
        rows
    }

    fn condensed_matrix(
        partial: bool,
    ) -> impl Strategy<Value = (usize, Vec<Option<f64>>)> {
        (2usize..9).prop_flat_map(move |n| {
            let entry = if partial {
                proptest::option::of(0.0f64..10.0).boxed()
            } else {
                (0.0f64..10.0).prop_map(Some).boxed()
            };
            (Just(n), proptest::collection::vec(entry, n * (n - 1) / 2))
        })
    }

    #[test]
    fn test_threshold_splits_into_two_groups() {
        let mut set = five_items();
        cluster(&mut set, Threshold(0.4), CompleteLinkage::new());

        assert_eq!(set.count(), 2);
        let expected: BTreeSet<_> = [group(&["a", "b", "c"]), group(&["d", "e"])].into();
        assert_eq!(partition(&set), expected);
    }

    #[test]
    fn test_threshold_one_joins_everything() {
        let mut set = five_items();
        cluster(&mut set, Threshold(1.0), CompleteLinkage::new());

        assert_eq!(set.count(), 1);
        assert_eq!(set.items(0).len(), 5);
    }

    #[test]
    fn test_zero_threshold_merges_zero_distance() {
        for method in Method::ALL {
            let mut set = DistanceMap::new([("a", [("b", 0.0)])]);
            cluster(&mut set, Threshold(0.0), method.linkage());
            assert_eq!(set.count(), 1, "{method}");
            assert_eq!(set.items(0).len(), 2, "{method}");
        }
    }

    #[test]
    fn test_max_clusters_stops_at_limit() {
        for method in Method::ALL {
            let mut set = five_items();
            let merges = cluster(&mut set, MaxClusters(2), method.linkage());
            assert_eq!(merges, 3, "{method}");
            assert_eq!(set.count(), 2, "{method}");
            assert_eq!(set.item_count(), 5, "{method}");
        }
    }

    #[test]
    fn test_unstructured_items_collapse_to_one() {
        let n = 12;
        let mut set = DistanceMap::new((0..n).map(|i| (i, Vec::<(usize, f64)>::new())));
        assert_eq!(set.count(), n);

        let merges = cluster(&mut set, Threshold(f64::INFINITY), CompleteLinkage::new());
        assert_eq!(merges, n - 1);
        assert_eq!(set.count(), 1);
        let members: BTreeSet<usize> = set.items(0).iter().copied().collect();
        assert_eq!(members, (0..n).collect());
    }

    #[test]
    fn test_upgma_scores_are_true_means() {
        // After {a,b} merges, d({a,b}, c) must be (0.2 + 0.6) / 2 and
        // d({a,b}, {c,d}) later the mean over all four pairs.
        let mut set = DistanceMap::new([
            ("a", vec![("b", 0.1), ("c", 0.2), ("d", 0.9)]),
            ("b", vec![("c", 0.6), ("d", 0.7)]),
            ("c", vec![("d", 0.15)]),
        ]);
        let mut heights = Vec::new();
        cluster(
            &mut set,
            |_: &DistanceMap<&str>, _: usize, _: usize, score: f64| {
                heights.push(score);
                true
            },
            Method::Average.linkage(),
        );
        assert_eq!(heights.len(), 3);
        assert!((heights[0] - 0.1).abs() < 1e-12);
        assert!((heights[1] - 0.15).abs() < 1e-12);
        let mean = (0.2 + 0.9 + 0.6 + 0.7) / 4.0;
        assert!((heights[2] - mean).abs() < 1e-12);
    }

    #[test]
    fn test_wpgma_weights_clusters_equally() {
        // {a,b} joins c first, then d. WPGMA averages d({a,b},d) and d(c,d)
        // instead of the three item pairs.
        let mut set = DistanceMap::new([
            ("a", vec![("b", 0.1), ("c", 0.2), ("d", 1.0)]),
            ("b", vec![("c", 0.2), ("d", 1.0)]),
            ("c", vec![("d", 0.4)]),
        ]);
        let mut heights = Vec::new();
        cluster(
            &mut set,
            |_: &DistanceMap<&str>, _: usize, _: usize, score: f64| {
                heights.push(score);
                true
            },
            Method::Weighted.linkage(),
        );
        assert!((heights[2] - 0.7).abs() < 1e-12, "{heights:?}");
    }

    #[test]
    fn test_relocating_set_groups_points() {
        let points = [0, 1, 5, 7, 20, 22, 23, 40];
        for method in Method::ALL {
            let mut line = LineSet::new(points);
            cluster(&mut line, Threshold(3.5), method.linkage());

            let mut groups: Vec<Vec<i64>> = line
                .clusters
                .iter()
                .map(|c| {
                    let mut c = c.clone();
                    c.sort_unstable();
                    c
                })
                .collect();
            groups.sort();
            assert_eq!(
                groups,
                vec![vec![0, 1], vec![5, 7], vec![20, 22, 23], vec![40]],
                "{method}"
            );
        }
    }

    #[test]
    fn test_without_recurrence_every_round_rescans() {
        let mut set = five_items();
        let mut probe = Probe::new(CompleteLinkage::new(), true);
        cluster(&mut set, MaxClusters(1), &mut probe);
        assert_eq!(probe.resets, 10);

        let mut degraded_set = five_items();
        let mut degraded = Probe::new(CompleteLinkage::new(), false);
        cluster(&mut degraded_set, MaxClusters(1), &mut degraded);
        assert_eq!(degraded.resets, 10 + 6 + 3 + 1);

        let mut plain_set = five_items();
        let mut plain = Probe::new(CompleteLinkage::new(), true);
        HierarchicalClustering::new(&mut plain_set, MaxClusters(1), &mut plain)
            .with_incremental(false)
            .run();
        assert_eq!(plain.resets, 10 + 6 + 3 + 1);
    }

    #[test]
    fn test_without_recurrence_same_result() {
        let mut expected = five_items();
        cluster(&mut expected, Threshold(0.4), CompleteLinkage::new());

        let mut set = five_items();
        cluster(
            &mut set,
            Threshold(0.4),
            Probe::new(CompleteLinkage::new(), false),
        );
        assert_eq!(partition(&set), partition(&expected));
    }

    #[test]
    fn test_checker_sees_candidate_before_merge() {
        let mut seen = Vec::new();
        let mut set = five_items();
        let mut record = |s: &DistanceMap<&str>, i: usize, j: usize, score: f64| {
            seen.push((s.count(), i, j, score));
            Threshold(0.4).check(s, i, j, score)
        };
        let merges = cluster(&mut set, &mut record, CompleteLinkage::new());

        assert_eq!(merges, 3);
        // The vetoed candidate is reported too, with the state it would merge.
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], (5, 0, 1, 0.0));
        assert_eq!(seen[3].0, 2);
        assert!(seen[3].3 > 0.4);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tree_log_traces_decisions() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .with_writer(move || sink.clone())
            .finish();

        let mut set = five_items();
        let merges = tracing::subscriber::with_default(subscriber, || {
            cluster(&mut set, TreeLog::new(Threshold(0.4)), CompleteLinkage::new())
        });
        assert_eq!(merges, 3);
        assert_eq!(set.count(), 2);

        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(log.lines().filter(|l| l.contains(": merge ")).count(), 3, "{log}");
        assert_eq!(log.lines().filter(|l| l.contains(": stop ")).count(), 1, "{log}");
        assert!(log.contains("clusters=2"), "{log}");
        // Merged membership shows up in the logged set.
        assert!(log.contains(r#"["a", "b"]"#), "{log}");
    }

    fn kodama_method(method: Method) -> kodama::Method {
        match method {
            Method::Single => kodama::Method::Single,
            Method::Complete => kodama::Method::Complete,
            Method::Average => kodama::Method::Average,
            Method::Weighted => kodama::Method::Weighted,
        }
    }

    proptest! {
        #[test]
        fn cached_scores_match_scratch_on_distance_maps(
            (n, condensed) in condensed_matrix(true),
        ) {
            for method in item_defined_methods() {
                let mut set = DistanceMap::new(distance_rows(n, &condensed));
                check_cache_against_scratch(&mut set, method)?;
            }
        }

        #[test]
        fn cached_scores_match_scratch_when_clusters_relocate(
            points in proptest::collection::btree_set(-50i64..50, 2..10),
        ) {
            for method in item_defined_methods() {
                let mut set = LineSet::new(points.iter().copied());
                check_cache_against_scratch(&mut set, method)?;
            }
        }

        #[test]
        fn count_drops_by_one_per_merge(
            (n, condensed) in condensed_matrix(true),
            method_idx in 0usize..4,
        ) {
            let method = Method::ALL[method_idx];
            let mut set = DistanceMap::new(distance_rows(n, &condensed));
            let mut counts = Vec::new();
            let merges = cluster(
                &mut set,
                |s: &DistanceMap<usize>, _: usize, _: usize, _: f64| {
                    counts.push(s.count());
                    true
                },
                method.linkage(),
            );
            prop_assert_eq!(merges, n - 1);
            prop_assert_eq!(set.count(), 1);
            let expected: Vec<usize> = (2..=n).rev().collect();
            prop_assert_eq!(counts, expected);
        }

        #[test]
        fn merge_heights_match_kodama(
            (n, condensed) in condensed_matrix(false),
        ) {
            let dense: Vec<f64> = condensed.iter().map(|d| d.unwrap_or(1.0)).collect();
            for method in Method::ALL {
                let mut set = DistanceMap::new(distance_rows(n, &condensed));
                let mut ours = Vec::new();
                cluster(
                    &mut set,
                    |_: &DistanceMap<usize>, _: usize, _: usize, score: f64| {
                        ours.push(score);
                        true
                    },
                    method.linkage(),
                );
                ours.sort_by(|a, b| a.total_cmp(b));

                let mut dis = dense.clone();
                let dend = kodama::linkage(&mut dis, n, kodama_method(method));
                let mut theirs: Vec<f64> = dend.steps().iter().map(|s| s.dissimilarity).collect();
                theirs.sort_by(|a, b| a.total_cmp(b));

                prop_assert_eq!(ours.len(), theirs.len());
                for (a, b) in ours.iter().zip(&theirs) {
                    prop_assert!((a - b).abs() < 1e-9, "{}: {:?} vs {:?}", method, ours, theirs);
                }
            }
        }
    }
}
