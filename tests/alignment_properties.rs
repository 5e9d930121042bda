use ux_triage_harness::{
    aggregate, align, alignment, overall_alignment, rank_by_misalignment, Dimension,
    DimensionAlignments, Evaluation, JustificationSet, Review, Score, ScoreSet,
};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn alignment_is_symmetric_quantized_and_bounded_over_the_full_grid() {
    for m in Score::all() {
        for h in Score::all() {
            let value = alignment(m, h);
            assert_eq!(value, alignment(h, m), "symmetry for ({m}, {h})");

            let steps = (1.0 - value) * 6.0;
            assert!(
                approx_eq(steps, steps.round(), 1e-12),
                "({m}, {h}) -> {value} is not a multiple of 1/6"
            );
            assert!((0.0..=1.0).contains(&value));
        }
        assert_eq!(alignment(m, m), 1.0);
    }
    assert_eq!(alignment(Score::MAX, Score::MIN), 0.0);
    assert_eq!(alignment(Score::MIN, Score::MAX), 0.0);
}

#[test]
fn overall_is_the_mean_of_dimensions_and_derivation_is_bit_stable() {
    let samples = [-3i64, -1, 0, 2, 3];
    for (i, &a) in samples.iter().enumerate() {
        for &b in &samples[i..] {
            let machine = ScoreSet::from_fn(|d| {
                Score::new(if d as usize % 2 == 0 { a } else { b }).unwrap()
            });
            let human = ScoreSet::from_fn(|d| Score::new(if d == Dimension::Novelty { b } else { a }).unwrap());

            let first = align(&machine, &human);
            let second = align(&machine, &human);
            assert_eq!(first.overall.to_bits(), second.overall.to_bits());
            assert_eq!(first, second);

            let mean: f64 = first.dimensions.iter().map(|(_, v)| v).sum::<f64>() / 6.0;
            assert!(approx_eq(first.overall, mean, 1e-12));
            assert_eq!(first.overall, overall_alignment(&first.dimensions));
        }
    }
}

fn generated_evaluations(count: i64) -> Vec<Evaluation> {
    (0..count)
        .map(|i| {
            let human = ScoreSet::from_fn(|d| Score::clamped((i + d as i64) % 7 - 3));
            let machine = ScoreSet::from_fn(|d| Score::clamped((i * 3 + 2 * d as i64) % 7 - 3));
            Evaluation::with_scores(
                Review::new(format!("r{i}"), "text", 3),
                human,
                machine,
                JustificationSet::default(),
            )
        })
        .collect()
}

#[test]
fn aggregate_overall_is_exactly_the_mean_of_evaluation_overalls() {
    for count in 1..40 {
        let evaluations = generated_evaluations(count);
        let result = aggregate(&evaluations);
        let mean_of_overalls =
            evaluations.iter().map(|e| e.overall()).sum::<f64>() / evaluations.len() as f64;
        assert_eq!(
            result.overall.to_bits(),
            mean_of_overalls.to_bits(),
            "overall drifted for {count} evaluations"
        );

        let mean_of_dimensions = overall_alignment(&result.per_dimension);
        assert!(approx_eq(result.overall, mean_of_dimensions, 1e-12));
    }
}

#[test]
fn aggregate_dimensions_and_extremes_are_consistent() {
    let evaluations = generated_evaluations(25);
    let result = aggregate(&evaluations);

    for dimension in Dimension::ALL {
        let mean = evaluations
            .iter()
            .map(|e| e.alignment().dimensions.get(dimension))
            .sum::<f64>()
            / evaluations.len() as f64;
        assert!(approx_eq(result.per_dimension.get(dimension), mean, 1e-12));
    }

    let best = result.per_dimension.get(result.best);
    let worst = result.per_dimension.get(result.worst);
    for (_, value) in result.per_dimension.iter() {
        assert!(value <= best && value >= worst);
    }
}

#[test]
fn empty_aggregate_is_defined() {
    let result = aggregate(&[]);
    assert_eq!(result.evaluation_count, 0);
    assert_eq!(result.overall, 0.0);
    assert_eq!(result.per_dimension, DimensionAlignments::default());
    assert!(rank_by_misalignment(&[]).is_empty());
}

#[test]
fn ranking_is_stable_across_many_ties() {
    let evaluations: Vec<Evaluation> = (0..12)
        .map(|i| {
            let machine = ScoreSet::uniform(Score::clamped(i % 3));
            Evaluation::with_scores(
                Review::new(format!("r{i:02}"), "t", 2),
                ScoreSet::zeroed(),
                machine,
                JustificationSet::default(),
            )
        })
        .collect();

    let ranked = rank_by_misalignment(&evaluations);
    for pair in ranked.windows(2) {
        assert!(pair[0].overall() <= pair[1].overall());
        if pair[0].overall() == pair[1].overall() {
            assert!(pair[0].id() < pair[1].id(), "tie order broken");
        }
    }
}
