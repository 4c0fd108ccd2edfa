use mask_eval::core_modules::group_merger::{self, EdgeRule};
use mask_eval::core_modules::mask_merger::mask_merger;
use mask_eval::core_modules::raster_labeler::component_count;
use mask_eval::core_modules::undirected_graph::UndirectedGraph;
use mask_eval::{BoundingBox, Mask, Region};
use proptest::prelude::*;

const SIDE: u32 = 16;

fn random_mask() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), (SIDE * SIDE) as usize)
}

/// Keeps only the pixels whose column lies in `columns`.
fn restricted(pixels: &[bool], columns: std::ops::Range<u32>) -> Mask {
    Mask::from_fn(SIDE, SIDE, |x, y| {
        columns.contains(&x) && pixels[(y * SIDE + x) as usize]
    })
}

fn rect_region() -> impl Strategy<Value = Region> {
    (0u32..20, 0u32..20, 1u32..6, 1u32..6, 1usize..4, 0.0f64..1.0).prop_map(
        |(y, x, h, w, class_id, score)| {
            let mut mask = Mask::new(24, 24);
            mask.fill_rect(y, x, (y + h).min(24), (x + w).min(24));
            Region {
                mask,
                class_id,
                score: Some(score),
            }
        },
    )
}

proptest! {
    #[test]
    fn separated_masks_never_touch(a in random_mask(), b in random_mask()) {
        // Column 8 stays empty, so nothing in A can neighbour anything in B.
        let left = restricted(&a, 0..8);
        let right = restricted(&b, 9..SIDE);

        prop_assert!(!mask_merger::touching(&left, &right).unwrap());
        let union = mask_merger::union(&left, &right).unwrap();
        prop_assert_eq!(
            component_count(&union),
            component_count(&left) + component_count(&right)
        );
    }

    #[test]
    fn adjacent_masks_touch(
        a in random_mask(),
        b in random_mask(),
        x in 0u32..SIDE - 1,
        y in 0u32..SIDE,
    ) {
        let mut left = Mask::from_fn(SIDE, SIDE, |px, py| a[(py * SIDE + px) as usize]);
        let mut right = Mask::from_fn(SIDE, SIDE, |px, py| b[(py * SIDE + px) as usize]);
        left.set(x, y, true);
        right.set(x + 1, y, true);

        prop_assert!(mask_merger::touching(&left, &right).unwrap());
        prop_assert!(mask_merger::touching(&right, &left).unwrap());
    }

    #[test]
    fn components_partition_every_node(
        n in 1usize..40,
        edges in prop::collection::vec((0usize..40, 0usize..40), 0..60),
    ) {
        let mut graph = UndirectedGraph::new(n);
        let mut linked = vec![false; n];
        for (i, j) in edges {
            let (i, j) = (i % n, j % n);
            graph.add_edge(i, j).unwrap();
            if i != j {
                linked[i] = true;
                linked[j] = true;
            }
        }

        let groups = graph.connected_components();
        let mut seen: Vec<usize> = groups.iter().flatten().copied().collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());

        for (node, &has_edge) in linked.iter().enumerate() {
            if !has_edge {
                prop_assert!(groups.iter().any(|g| g.as_slice() == [node]));
            }
        }
        for pair in groups.windows(2) {
            prop_assert!(pair[0][0] < pair[1][0]);
        }
    }

    #[test]
    fn iou_is_symmetric_and_bounded(
        (ay, ax, ah, aw) in (0u32..50, 0u32..50, 1u32..30, 1u32..30),
        (by, bx, bh, bw) in (0u32..50, 0u32..50, 1u32..30, 1u32..30),
    ) {
        let a = BoundingBox::new(ay, ax, ay + ah, ax + aw);
        let b = BoundingBox::new(by, bx, by + bh, bx + bw);

        prop_assert_eq!(a.iou(&b), b.iou(&a));
        prop_assert!((0.0..=1.0).contains(&a.iou(&b)));
        prop_assert_eq!(a.iou(&a), 1.0);

        let far = BoundingBox::new(ay + ah + 1, ax, ay + ah + 1 + bh, ax + bw);
        prop_assert_eq!(a.iou(&far), 0.0);
    }

    #[test]
    fn merging_is_idempotent(regions in prop::collection::vec(rect_region(), 0..8)) {
        let once = group_merger::merge(&regions, EdgeRule::SameClassTouching).unwrap();
        let again_input: Vec<Region> = once.iter().cloned().map(Region::from).collect();
        let twice = group_merger::merge(&again_input, EdgeRule::SameClassTouching).unwrap();
        prop_assert_eq!(once, twice);
    }
}
