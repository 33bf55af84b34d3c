use crate::error::CloudIndexError;
use crate::kdtree::{
    ConstructionPath, IncrementalKDTree, KDTree, KDTreeBuilder, KDTreeIndex, Node, SpatialIndex,
};
use crate::test::fixtures::{
    assert_kd_ordered, collect_indices, distinct_coords, random_coords, seeded_rng,
    unit_axes_coords,
};
use crate::Coord;

fn make_index(coords: &[f32]) -> KDTree<'_, f32> {
    KDTreeBuilder::new(coords).unwrap().finish()
}

/// Reference pre-order walk through the child accessors.
fn preorder<T: KDTreeIndex<f32>>(node: Node<'_, f32, T>, out: &mut Vec<u32>) {
    out.push(node.position());
    if let Some(left) = node.left_child() {
        preorder(left, out);
    }
    if let Some(right) = node.right_child() {
        preorder(right, out);
    }
}

#[test]
fn nearest_in_unit_axes() {
    let coords = unit_axes_coords();
    let tree = make_index(&coords);

    assert_eq!(tree.nearest(0.1, 0.1, 0.1).unwrap(), 0);
    assert_eq!(tree.nearest(0.9, 0.2, 0.).unwrap(), 1);
    assert_eq!(tree.nearest(4., 4., 4.).unwrap(), 4);

    let node = tree.nearest_node(0.1, 0.1, 0.1).unwrap();
    assert_eq!(node.index(), 0);
    assert_eq!(node.xyz(), [0., 0., 0.]);
}

#[test]
fn within_unit_axes() {
    let coords = unit_axes_coords();
    let tree = make_index(&coords);

    let mut result = tree.within(0.1, 0.1, 0.1, 1.5);
    result.sort();
    assert_eq!(result, vec![0, 1, 2, 3], "radius is not squared");

    let result = tree.within(0.1, 0.1, 0.1, 0.5);
    assert_eq!(result, vec![0]);

    let mut result = tree.within(0., 0., 0., 1.);
    result.sort();
    assert_eq!(result, vec![0, 1, 2, 3], "points on the sphere are included");

    assert_eq!(tree.within(5., 5., 5., 0.), vec![4], "zero radius finds exact matches");
    assert!(tree.within(0., 0., 0., -1.).is_empty());
    assert!(tree.within(0., 0., 0., f32::NAN).is_empty());
}

#[test]
fn empty_tree_queries() {
    let coords: Vec<f32> = vec![];
    let tree = make_index(&coords);

    assert!(tree.is_empty());
    assert_eq!(tree.num_items(), 0);
    assert_eq!(tree.depth(), 0);
    assert!(tree.root().is_none());
    assert!(tree.nearest_node(0., 0., 0.).is_none());
    assert_eq!(
        tree.nearest(0., 0., 0.).unwrap_err(),
        CloudIndexError::EmptyStructure
    );
    assert_eq!(
        tree.nearest_with_distance(0., 0., 0.).unwrap_err(),
        CloudIndexError::EmptyStructure
    );
    assert!(tree.within(0., 0., 0., 100.).is_empty());
    assert_eq!(tree.nearest_batch(&[0., 0., 0.]).unwrap(), vec![None]);

    let mut visited = 0;
    tree.traverse(|_| visited += 1);
    assert_eq!(visited, 0);

    let incremental = IncrementalKDTree::<f32>::new(&coords).unwrap();
    assert!(incremental.nearest_node(1., 2., 3.).is_none());
    assert!(incremental.within(1., 2., 3., 4.).is_empty());

    let index = SpatialIndex::<f32>::new();
    assert_eq!(
        index.nearest(0., 0., 0.).unwrap_err(),
        CloudIndexError::EmptyStructure
    );
}

#[test]
fn points_attached_but_not_built() {
    let coords = unit_axes_coords();
    let mut index = SpatialIndex::with_points(&coords, 5).unwrap();
    assert_eq!(index.num_items(), 5);
    assert!(index.is_empty());
    assert_eq!(
        index.nearest(0., 0., 0.).unwrap_err(),
        CloudIndexError::EmptyStructure
    );

    index.build().unwrap();
    assert_eq!(index.num_nodes(), 5);
    assert_eq!(index.nearest(0., 0., 0.).unwrap(), 0);
}

#[test]
fn single_point() {
    let coords = [3., -2., 7.];
    let tree = make_index(&coords);

    let root = tree.root().unwrap();
    assert!(root.is_leaf());
    assert!(!root.is_parent());
    assert_eq!(root.index(), 0);
    assert_eq!(tree.depth(), 1);
    assert_eq!(tree.nearest(100., 100., 100.).unwrap(), 0);
    assert_eq!(tree.within(3., -2., 7., 0.), vec![0]);
}

#[test]
fn build_is_repeatable() {
    let mut rng = seeded_rng(7);
    let coords = random_coords(&mut rng, 257, 50.);
    let mut builder = KDTreeBuilder::new(&coords).unwrap();

    let first = builder.build();
    let second = builder.build();
    for tree in [&first, &second] {
        assert_kd_ordered(tree);
        assert_eq!(
            collect_indices(tree),
            (0..257).collect::<Vec<u32>>(),
            "every point appears exactly once"
        );
    }
    assert_eq!(first.nearest(1., 2., 3.), second.nearest(1., 2., 3.));
}

#[test]
fn balanced_depth() {
    let coords = distinct_coords(1000);
    let tree = make_index(&coords);

    assert_kd_ordered(&tree);
    assert_eq!(tree.num_nodes(), 1000);
    assert_eq!(tree.depth(), 10, "ceil(log2(1001)) levels");
}

#[test]
fn identical_points() {
    let coords: Vec<f32> = [1., 2., 3.].repeat(10);
    let tree = make_index(&coords);

    assert_kd_ordered(&tree);
    // equal keys always go right
    assert_eq!(tree.depth(), 10);

    let root = tree.root().unwrap();
    assert!(root.left_child().is_none());

    let (_, d2) = tree.nearest_with_distance(1., 2., 4.).unwrap();
    assert_eq!(d2, 1.);
    let mut result = tree.within(1., 2., 3., 0.);
    result.sort();
    assert_eq!(result, (0..10).collect::<Vec<u32>>());
}

#[test]
fn permutation_tracks_build() {
    let coords = unit_axes_coords();
    let mut builder = KDTreeBuilder::new(&coords).unwrap();
    assert_eq!(builder.permutation(), &[0, 1, 2, 3, 4]);
    assert_eq!(builder.mapped_point(4).unwrap(), [5., 5., 5.]);

    let tree = builder.build();
    let mut permutation = builder.permutation().to_vec();
    for (position, index) in permutation.iter().enumerate() {
        assert_eq!(
            builder.mapped_point(position).unwrap(),
            tree.point(*index as usize).unwrap()
        );
    }
    permutation.sort();
    assert_eq!(permutation, vec![0, 1, 2, 3, 4]);

    assert_eq!(
        builder.mapped_point(5).unwrap_err(),
        CloudIndexError::IndexOutOfRange {
            index: 5,
            num_items: 5
        }
    );

    builder.attach_points(&coords, 3).unwrap();
    assert_eq!(builder.permutation(), &[0, 1, 2]);
    let tree = builder.build();
    assert_eq!(tree.num_items(), 3);
    assert_eq!(tree.nearest(5., 0., 0.).unwrap(), 1);
}

#[test]
fn attach_rejects_bad_buffers() {
    let coords = unit_axes_coords();
    let mut builder = KDTreeBuilder::new(&coords).unwrap();

    assert_eq!(
        builder.attach_points(&coords, 6).unwrap_err(),
        CloudIndexError::InvalidPointBuffer {
            len: 15,
            num_items: 6
        }
    );
    assert_eq!(builder.points().num_items(), 5, "failed attach keeps points");

    let nan = [0., 0., f32::NAN];
    assert_eq!(
        KDTreeBuilder::new(&nan).unwrap_err(),
        CloudIndexError::InvalidCoordinate { index: 0 }
    );
}

#[test]
fn builder_from_bytes() {
    let coords: Vec<f64> = vec![0., 0., 0., 10., 10., 10.];
    let tree = KDTreeBuilder::<f64>::from_bytes(bytemuck::cast_slice(&coords))
        .unwrap()
        .finish();
    assert_eq!(tree.nearest(9., 9., 9.).unwrap(), 1);
}

#[test]
fn traverse_is_preorder() {
    let mut rng = seeded_rng(11);
    let coords = random_coords(&mut rng, 100, 10.);
    let tree = make_index(&coords);

    let mut visited = vec![];
    tree.traverse(|node| visited.push(node.position()));
    let mut expected = vec![];
    preorder(tree.root().unwrap(), &mut expected);

    assert_eq!(visited, expected);
    assert_eq!(visited[0], 0, "root comes first");

    let left = tree.root().unwrap().left_child().unwrap();
    let mut subtree = vec![];
    left.traverse(|node| subtree.push(node.position()));
    assert_eq!(subtree.len(), left.subtree_len());
    assert_eq!(&visited[1..=subtree.len()], subtree.as_slice());
}

#[test]
fn node_handles() {
    let coords = unit_axes_coords();
    let tree = make_index(&coords);
    let root = tree.root().unwrap();

    assert_eq!(root.depth(), 0);
    assert_eq!(root.axis(), 0);
    assert!(root.is_parent());
    assert_eq!(root.subtree_len(), 5);

    tree.traverse(|node| {
        assert_eq!(node.axis(), node.depth() % 3);
        assert_eq!(
            node.coord().to_array(),
            tree.point(node.index() as usize).unwrap()
        );
        for child in [node.left_child(), node.right_child()].into_iter().flatten() {
            assert_eq!(child.depth(), node.depth() + 1);
        }
    });
}

#[test]
fn coord_queries() {
    let coords = unit_axes_coords();
    let tree = make_index(&coords);

    let query = Coord::new(0.1, 0.1, 0.9);
    assert_eq!(tree.nearest_coord(&query).unwrap(), 3);

    let mut result = tree.within_coord(&Coord::new(5., 5., 4.), 1.);
    result.sort();
    assert_eq!(result, vec![4]);
}

#[test]
fn nearest_batch_matches_single_queries() {
    let mut rng = seeded_rng(13);
    let coords = random_coords(&mut rng, 500, 20.);
    let queries = random_coords(&mut rng, 64, 25.);
    let tree = make_index(&coords);

    let batch = tree.nearest_batch(&queries).unwrap();
    assert_eq!(batch.len(), 64);
    for (q, result) in queries.chunks_exact(3).zip(batch) {
        assert_eq!(result, Some(tree.nearest(q[0], q[1], q[2]).unwrap()));
    }

    assert_eq!(
        tree.nearest_batch(&queries[..4]).unwrap_err(),
        CloudIndexError::InvalidPointBuffer {
            len: 4,
            num_items: 2
        }
    );
}

#[test]
fn concurrent_queries() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<KDTree<'static, f32>>();
    assert_send_sync::<IncrementalKDTree<'static, f32>>();
    assert_send_sync::<SpatialIndex<'static, f64>>();

    let mut rng = seeded_rng(17);
    let coords = random_coords(&mut rng, 2000, 100.);
    let tree = make_index(&coords);
    let expected = tree.nearest(1., 1., 1.).unwrap();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..100 {
                    assert_eq!(tree.nearest(1., 1., 1.).unwrap(), expected);
                }
            });
        }
    });
}

#[test]
fn incremental_insertion() {
    let coords = unit_axes_coords();
    let mut tree = IncrementalKDTree::new(&coords).unwrap();

    tree.insert(4).unwrap();
    tree.insert(0).unwrap();
    assert_eq!(tree.num_nodes(), 2);
    assert_eq!(tree.root().unwrap().index(), 4, "first insert is the root");
    assert_eq!(
        tree.root().unwrap().left_child().unwrap().index(),
        0,
        "0 < 5 on x"
    );

    tree.extend([1, 2, 3]).unwrap();
    assert_kd_ordered(&tree);
    assert_eq!(collect_indices(&tree), vec![0, 1, 2, 3, 4]);
    assert_eq!(tree.nearest(0.1, 0.1, 0.1).unwrap(), 0);

    assert_eq!(
        tree.insert(5).unwrap_err(),
        CloudIndexError::IndexOutOfRange {
            index: 5,
            num_items: 5
        }
    );
    assert_eq!(tree.num_nodes(), 5, "failed insert leaves the tree alone");

    tree.clear();
    assert!(tree.is_empty());
    assert!(tree.nearest_node(0., 0., 0.).is_none());
    tree.clear();
    tree.insert(2).unwrap();
    assert_eq!(tree.nearest(0., 0., 0.).unwrap(), 2);
}

#[test]
fn sorted_insertion_degenerates() {
    let num_points = 5000;
    let coords: Vec<f32> = (0..num_points).flat_map(|i| [i as f32, 0., 0.]).collect();
    let mut tree = IncrementalKDTree::new(&coords).unwrap();
    tree.extend(0..num_points as u32).unwrap();

    assert_eq!(tree.depth(), num_points, "every point hangs off the right");
    assert_eq!(tree.nearest(4321.2, 0., 0.).unwrap(), 4321);
    assert_eq!(tree.nearest(-10., 3., 3.).unwrap(), 0);
    let mut result = tree.within(10., 0., 0., 2.);
    result.sort();
    assert_eq!(result, vec![8, 9, 10, 11, 12]);
}

#[test]
fn spatial_index_rejects_mixed_construction() {
    let coords = unit_axes_coords();
    let mut index = SpatialIndex::with_points(&coords, 5).unwrap();
    assert_eq!(index.construction_path(), None);

    index.build().unwrap();
    assert_eq!(index.construction_path(), Some(ConstructionPath::Build));
    let err = index.insert(0).unwrap_err();
    assert_eq!(
        err,
        CloudIndexError::InconsistentConstructionPath {
            attempted: ConstructionPath::Insert,
            existing: ConstructionPath::Build,
        }
    );
    assert_eq!(
        err.to_string(),
        "Cannot insert into a tree that was constructed by build."
    );
    index.build().unwrap();
    assert_eq!(index.num_nodes(), 5, "rebuilding is allowed");

    index.clear();
    assert_eq!(index.construction_path(), None);
    index.insert(3).unwrap();
    index.insert(1).unwrap();
    assert_eq!(index.construction_path(), Some(ConstructionPath::Insert));
    assert_eq!(
        index.build().unwrap_err(),
        CloudIndexError::InconsistentConstructionPath {
            attempted: ConstructionPath::Build,
            existing: ConstructionPath::Insert,
        }
    );
    assert_eq!(index.nearest(0.9, 0., 0.).unwrap(), 1);
    assert_eq!(index.nearest(0., 0., 0.9).unwrap(), 3);
}

#[test]
fn spatial_index_attach_and_failures() {
    let coords = unit_axes_coords();
    let mut index = SpatialIndex::new();

    // nothing attached: building is a no-op, inserting is out of range
    index.build().unwrap();
    assert!(index.is_empty());
    assert_eq!(index.construction_path(), None);
    assert_eq!(
        index.insert(0).unwrap_err(),
        CloudIndexError::IndexOutOfRange {
            index: 0,
            num_items: 0
        }
    );
    assert_eq!(index.construction_path(), None);

    index.attach_points(&coords, 5).unwrap();
    index.insert(4).unwrap();
    assert_eq!(index.builder().permutation(), &[0, 1, 2, 3, 4]);

    index.attach_points(&coords, 2).unwrap();
    assert!(index.is_empty(), "attaching discards the tree");
    index.build().unwrap();
    assert_eq!(collect_indices(&index), vec![0, 1]);

    assert!(index.attach_points(&coords, 10).is_err());
    assert_eq!(index.num_nodes(), 2, "failed attach keeps the tree");
}
