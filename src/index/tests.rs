use super::*;

fn sample_index() -> FlatIndex {
    FlatIndex::build(vec![
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![0.0, 2.0],
        vec![3.0, 3.0],
    ])
    .expect("should build index")
}

#[test]
fn squared_distance() {
    assert!((squared_l2(&[0.0, 0.0], &[3.0, 4.0]) - 25.0).abs() < f32::EPSILON);
    assert!(squared_l2(&[1.5, -2.0], &[1.5, -2.0]).abs() < f32::EPSILON);
}

#[test]
fn search_orders_by_distance() {
    let index = sample_index();

    let hits = index.search(&[0.9, 0.1], 3).expect("search should succeed");

    assert_eq!(
        hits.iter().map(|n| n.position).collect::<Vec<_>>(),
        vec![1, 0, 2]
    );
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!((hits[0].distance - 0.02).abs() < 1e-6);
}

#[test]
fn k_saturates_to_available_vectors() {
    let index = FlatIndex::build(vec![vec![1.0, 1.0], vec![2.0, 2.0]]).expect("should build");

    let hits = index.search(&[0.0, 0.0], 3).expect("search should succeed");

    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|n| n.position < index.len()));
}

#[test]
fn zero_k_and_empty_index_return_nothing() {
    let index = sample_index();
    assert!(index.search(&[0.0, 0.0], 0).expect("search").is_empty());

    let empty = FlatIndex::build(Vec::new()).expect("should build empty index");
    assert!(empty.is_empty());
    assert!(empty.search(&[1.0, 2.0, 3.0], 5).expect("search").is_empty());
}

#[test]
fn ties_break_by_position() {
    let index = FlatIndex::build(vec![vec![1.0, 0.0], vec![-1.0, 0.0], vec![0.0, 1.0]])
        .expect("should build");

    let hits = index.search(&[0.0, 0.0], 3).expect("search should succeed");

    assert_eq!(
        hits.iter().map(|n| n.position).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[test]
fn positions_stay_in_range() {
    let vectors = (0..50)
        .map(|i| vec![i as f32, (i % 7) as f32, (i % 3) as f32])
        .collect::<Vec<_>>();
    let index = FlatIndex::build(vectors).expect("should build");

    for k in [1, 5, 50, 500] {
        let hits = index.search(&[10.0, 2.0, 1.0], k).expect("search");
        assert_eq!(hits.len(), k.min(50));
        assert!(hits.iter().all(|n| n.position < 50));
    }
}

#[test]
fn identical_queries_are_deterministic() {
    let index = sample_index();

    let first = index.search(&[1.0, 1.0], 4).expect("search");
    let second = index.search(&[1.0, 1.0], 4).expect("search");

    assert_eq!(first, second);
}

#[test]
fn build_rejects_inconsistent_vectors() {
    assert_eq!(
        FlatIndex::build(vec![vec![1.0, 2.0], vec![1.0]]),
        Err(IndexError::DimensionMismatch {
            position: 1,
            expected: 2,
            actual: 1
        })
    );
    assert_eq!(
        FlatIndex::build(vec![Vec::new()]),
        Err(IndexError::EmptyVector(0))
    );
    assert_eq!(
        FlatIndex::build(vec![vec![0.0], vec![f32::NAN]]),
        Err(IndexError::NonFinite(1))
    );
}

#[test]
fn query_dimension_must_match() {
    let index = sample_index();

    assert_eq!(
        index.search(&[1.0, 2.0, 3.0], 1),
        Err(IndexError::QueryDimensionMismatch {
            expected: 2,
            actual: 3
        })
    );
    assert_eq!(index.dimension(), 2);
}
