#[cfg(test)]
mod tests {
    use crate::cluster::{k_medoids, spectral_partition, Partitioner, SpectralPartitioner};
    use crate::distance::to_distance;
    use crate::fusion::{average_combine, fuse};
    use crate::harness::{Algorithm, Network, Pipeline};
    use crate::matrix::{AffinityMatrix, SampleFeatureMatrix};
    use crate::metrics::{ari, score};
    use crate::partition::Partition;
    use crate::source::SourceSet;
    use crate::{build_affinity, PipelineConfig, Result};
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids() -> Vec<String> {
        (1..=6).map(|i| format!("sample{i}")).collect()
    }

    /// Two tight groups far apart: {1,2,3} and {4,5,6}.
    fn clean_source() -> SampleFeatureMatrix {
        SampleFeatureMatrix::from_rows(
            ids(),
            &[
                vec![0.0, 0.0],
                vec![0.3, 0.1],
                vec![0.1, 0.4],
                vec![10.0, 10.0],
                vec![10.2, 9.7],
                vec![9.8, 10.3],
            ],
        )
        .unwrap()
    }

    /// No group structure.
    fn noise_source() -> SampleFeatureMatrix {
        SampleFeatureMatrix::from_rows(
            ids(),
            &[
                vec![0.7, -1.2, 0.4],
                vec![-0.3, 0.9, 1.1],
                vec![1.4, 0.2, -0.8],
                vec![-1.0, -0.5, 0.6],
                vec![0.2, 1.3, -0.4],
                vec![0.9, -0.7, -1.3],
            ],
        )
        .unwrap()
    }

    fn split() -> Partition {
        Partition::from_assignments(&[0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_fusion_keeps_clean_structure_over_noise() -> Result<()> {
        let a = build_affinity(&clean_source(), 2)?;
        let b = build_affinity(&noise_source(), 2)?;
        let fused = fuse(&[a, b], 2, 20)?;

        let cross = fused.get(0, 3);
        for (i, j) in [(0, 1), (1, 2), (0, 2)] {
            assert!(
                fused.get(i, j) > 2.0 * cross,
                "within ({i},{j}) = {} vs cross {cross}",
                fused.get(i, j)
            );
        }

        let partition = k_medoids(&to_distance(&fused), 2)?;
        assert_eq!(partition.labels(), &[0, 0, 0, 1, 1, 1]);
        let report = score(&partition, &split())?;
        assert_eq!(report.rand_index, 1.0);
        assert!((report.adjusted_rand_index - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_noise_alone_misses_the_split() -> Result<()> {
        let b = build_affinity(&noise_source(), 2)?;
        let partition = k_medoids(&to_distance(&b), 2)?;
        assert!(score(&partition, &split())?.rand_index < 1.0);
        Ok(())
    }

    #[test]
    fn test_spectral_on_fused_network() -> Result<()> {
        let a = build_affinity(&clean_source(), 2)?;
        let b = build_affinity(&noise_source(), 2)?;
        let fused = fuse(&[a, b], 2, 20)?;

        let seeded = spectral_partition(&fused, 2, &mut StdRng::seed_from_u64(3))?;
        assert_eq!(seeded, split());
        assert_eq!(SpectralPartitioner::new(2).partition(&fused)?, split());
        Ok(())
    }

    /// A pairs {1,2} {3,4}; B pairs {1,3} {2,4}. Each source puts the pair
    /// the other one groups at 0.5 and the remaining cross pair at 0.75.
    fn opposite_sources() -> (AffinityMatrix, AffinityMatrix) {
        let a = AffinityMatrix::new(array![
            [0.0, 1.0, 0.5, 0.75],
            [1.0, 0.0, 0.75, 0.5],
            [0.5, 0.75, 0.0, 1.0],
            [0.75, 0.5, 1.0, 0.0],
        ])
        .unwrap();
        let b = AffinityMatrix::new(array![
            [0.0, 0.5, 1.0, 0.75],
            [0.5, 0.0, 0.75, 1.0],
            [1.0, 0.75, 0.0, 0.5],
            [0.75, 1.0, 0.5, 0.0],
        ])
        .unwrap();
        (a, b)
    }

    fn off_diagonal_spread(w: &AffinityMatrix) -> f64 {
        let values: Vec<f64> = w
            .view()
            .indexed_iter()
            .filter(|((i, j), _)| i != j)
            .map(|(_, &v)| v)
            .collect();
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        max - min
    }

    #[test]
    fn test_averaging_opposite_structures() -> Result<()> {
        let (wa, wb) = opposite_sources();
        let a_labels = [0, 0, 1, 1];
        let b_labels = [0, 1, 0, 1];

        // each source on its own is recovered exactly
        assert_eq!(k_medoids(&to_distance(&wa), 2)?.labels(), &a_labels);
        assert_eq!(k_medoids(&to_distance(&wb), 2)?.labels(), &b_labels);

        // the mean erases both structures
        let avg = average_combine([&wa, &wb])?;
        assert!(off_diagonal_spread(&avg) < 1e-12);

        let partition = k_medoids(&to_distance(&avg), 2)?;
        let vs_a = ari(partition.labels(), &a_labels);
        let vs_b = ari(partition.labels(), &b_labels);
        assert!(vs_a.abs() < 1e-12, "ari vs A {vs_a}");
        assert!(vs_b.abs() < 1e-12, "ari vs B {vs_b}");
        Ok(())
    }

    #[test]
    fn test_fusion_of_opposite_structures_favors_neither() -> Result<()> {
        let (wa, wb) = opposite_sources();
        let fused = fuse(&[wa, wb], 1, 20)?;
        assert!(fused.is_symmetric(1e-12));
        // no pair is preferred: neither source wins the consensus
        assert!(off_diagonal_spread(&fused) < 1e-9);
        Ok(())
    }

    #[test]
    fn test_fusion_separates_better_than_averaging() -> Result<()> {
        let a = build_affinity(&clean_source(), 2)?;
        let b = build_affinity(&noise_source(), 2)?;
        let avg = average_combine([&a, &b])?;
        let fused = fuse(&[a, b], 2, 20)?;

        // weakest within-group affinity over strongest cross-group affinity
        let margin = |w: &AffinityMatrix| {
            let mut within = f64::INFINITY;
            let mut cross = 0.0f64;
            for i in 0..6 {
                for j in 0..6 {
                    if i == j {
                        continue;
                    }
                    if (i < 3) == (j < 3) {
                        within = within.min(w.get(i, j));
                    } else {
                        cross = cross.max(w.get(i, j));
                    }
                }
            }
            within / cross
        };
        let (avg_margin, fused_margin) = (margin(&avg), margin(&fused));
        assert!(avg_margin < 1.5, "average margin {avg_margin}");
        assert!(fused_margin > 3.0, "fused margin {fused_margin}");
        Ok(())
    }

    #[test]
    fn test_identical_copies_fuse_independently_of_count() -> Result<()> {
        let w = build_affinity(&clean_source(), 2)?;
        let two = fuse(&[w.clone(), w.clone()], 2, 20)?;
        let four = fuse(&[w.clone(), w.clone(), w.clone(), w], 2, 20)?;
        for i in 0..6 {
            for j in 0..6 {
                assert!((two.get(i, j) - four.get(i, j)).abs() < 1e-10);
            }
        }
        Ok(())
    }

    #[test]
    fn test_pipeline_on_toy_sources() -> Result<()> {
        let sources = SourceSet::new()
            .with_source("clean", clean_source())?
            .with_source("noise", noise_source())?;
        let config = PipelineConfig {
            neighbors: 2,
            ..Default::default()
        };
        let eval = Pipeline::new(config)?.run(&sources, &split())?;

        let fused = eval
            .row(&Network::Fused, Algorithm::KMedoids)
            .expect("fused k-medoids row");
        assert_eq!(fused.partition, split());
        assert_eq!(fused.report.rand_index, 1.0);

        let best = eval.best().expect("rows");
        assert!((best.report.adjusted_rand_index - 1.0).abs() < 1e-12);
        // the clean source agrees with the consensus more than the noise does
        let clean = eval.concordance.with_fused("clean").unwrap_or(0.0);
        let noise = eval.concordance.with_fused("noise").unwrap_or(0.0);
        assert!(clean > noise, "clean {clean} vs noise {noise}");
        Ok(())
    }
}
