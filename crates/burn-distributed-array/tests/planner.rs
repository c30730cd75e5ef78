use burn_distributed_array::Dims;
use burn_distributed_array::planner::{
    Bias, ExhaustiveSearch, PinnedDispatcher, Planner, PrimeFactorHeuristic, RelaxedHeuristic,
    evaluate,
};
use rstest::rstest;

fn dims(values: &[usize]) -> Dims {
    Dims::new(values).unwrap()
}

fn planners() -> Vec<Box<dyn Planner>> {
    vec![
        Box::new(ExhaustiveSearch::new(0.1)),
        Box::new(RelaxedHeuristic::new(0.1)),
        Box::new(PrimeFactorHeuristic::new(0.1, Bias::Leading)),
        Box::new(PrimeFactorHeuristic::new(0.1, Bias::Balanced)),
        Box::new(PrimeFactorHeuristic::new(0.1, Bias::Trailing)),
        Box::new(PinnedDispatcher::default()),
    ]
}

#[rstest]
#[case(&[100, 100], 4)]
#[case(&[1000], 40)]
#[case(&[17, 5, 3], 12)]
#[case(&[64, 64, 64], 24)]
#[case(&[7, 11, 13, 2], 30)]
#[case(&[5, 9], 16)]
fn test_plans_are_valid_and_fit_the_group(#[case] extents: &[usize], #[case] npes: usize) {
    let extents = dims(extents);
    let blocks = extents.map(|_| 0);

    for planner in planners() {
        let plan = planner.plan(&extents, npes, &blocks);

        assert!(plan.is_valid(), "{planner:?} gave {plan}");
        assert!(plan.processes() <= npes, "{planner:?} gave {plan}");
        assert!(plan.blocks().iter().zip(extents.iter()).all(|(b, n)| b <= n));

        let ratio = evaluate(&extents, plan.grid());
        assert!(ratio > 0.0 && ratio <= 1.0, "{planner:?} ratio {ratio}");
    }
}

#[rstest]
#[case(&[120, 45], 6)]
#[case(&[9, 10, 11], 8)]
fn test_planning_is_deterministic(#[case] extents: &[usize], #[case] npes: usize) {
    let extents = dims(extents);
    let blocks = extents.map(|_| 0);

    for planner in planners() {
        assert_eq!(
            planner.plan(&extents, npes, &blocks),
            planner.plan(&extents, npes, &blocks),
            "{planner:?}"
        );
    }
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(64)]
fn test_one_dimension_uses_every_process(#[case] npes: usize) {
    let plan = ExhaustiveSearch::new(0.1).plan(&dims(&[500]), npes, &dims(&[0]));

    assert_eq!(&**plan.grid(), &[npes]);
}

#[test]
fn test_local_shares_partition_the_array() {
    let extents = dims(&[37, 12]);
    let plan = PinnedDispatcher::default().plan(&extents, 6, &dims(&[10, 0]));

    let total: usize = (0..6).map(|rank| plan.local_len(&extents, rank).unwrap()).sum();

    assert_eq!(total, 37 * 12);
}

#[test]
fn test_invalid_requests_give_a_zeroed_plan() {
    for planner in planners() {
        let plan = planner.plan(&dims(&[10, 10]), 0, &dims(&[0, 0]));

        assert!(!plan.is_valid(), "{planner:?}");
    }
}
