// THEORY:
// The `GroupMerger` is the engine of the reconciliation layer. It takes an
// unordered bag of regions and decides which of them are really the same object.
//
// Key architectural principles & algorithm steps:
// 1.  **Relation as a Graph**: Every region becomes a node of an `UndirectedGraph`.
//     Every unordered pair is tested once with a pairwise predicate (the
//     `EdgeRule`), and an edge is added when it holds. Per-image region counts
//     are small, so the O(N²) pair scan is fine.
// 2.  **Transitive Closure via Components**: "A touches B and B touches C" makes
//     A, B and C one object even when A and C are far apart. Connected components
//     of the graph give exactly that closure.
// 3.  **Fold**: Each component's masks are OR-ed together; scores are averaged.
// 4.  **Overlap Resolution**: A second, class-blind pass finds groups of touching
//     instances and keeps only the most confident member of each group.
// 5.  **Pure Functions**: No state survives a call; the output depends only on
//     the input list and its order.

use crate::core_modules::instance::{Instance, Region};
use crate::core_modules::mask::{ClassId, Mask};
use crate::core_modules::mask_merger::mask_merger;
use crate::core_modules::raster_labeler::component_count;
use crate::core_modules::undirected_graph::UndirectedGraph;
use crate::error::Result;
use tracing::debug;

/// Pairwise rule deciding whether two regions get an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRule {
    /// Touching and carrying the same class id.
    SameClassTouching,
    /// Touching, whatever the classes.
    Touching,
}

fn build_graph(items: &[(&Mask, ClassId)], rule: EdgeRule) -> Result<UndirectedGraph> {
    let counts: Vec<u32> = items.iter().map(|(mask, _)| component_count(mask)).collect();
    let mut graph = UndirectedGraph::new(items.len());

    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let (mask_i, class_i) = items[i];
            let (mask_j, class_j) = items[j];
            if rule == EdgeRule::SameClassTouching && class_i != class_j {
                continue;
            }
            if mask_merger::touching_with_counts(mask_i, counts[i], mask_j, counts[j])? {
                debug!("Masks ({}, {}) are connected and can be merged", i, j);
                graph.add_edge(i, j)?;
            }
        }
    }

    Ok(graph)
}

/// Groups `regions` under `rule` and unions every group into one instance.
///
/// Output order follows component discovery (ordered by each group's first
/// region). The merged class is that of the group's first region, the merged
/// score the mean of the members' scores when they have one.
pub fn merge(regions: &[Region], rule: EdgeRule) -> Result<Vec<Instance>> {
    let items: Vec<(&Mask, ClassId)> = regions.iter().map(|r| (&r.mask, r.class_id)).collect();
    let graph = build_graph(&items, rule)?;

    let mut merged = Vec::new();
    for group in graph.connected_components() {
        let Some((&first, rest)) = group.split_first() else {
            continue;
        };

        let mut mask = regions[first].mask.clone();
        for &index in rest {
            debug!("Merging mask no. {} into mask no. {}", index, first);
            mask = mask_merger::union(&mask, &regions[index].mask)?;
        }

        let scores: Vec<f64> = group.iter().filter_map(|&i| regions[i].score).collect();
        let score = (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64);

        merged.push(Instance {
            mask,
            class_id: regions[first].class_id,
            score,
        });
    }

    debug!("{} regions merged into {} instances", regions.len(), merged.len());
    Ok(merged)
}

/// Finds groups of touching instances regardless of class and keeps the most
/// confident member of each. Ties keep the earliest instance of the group.
pub fn resolve_overlaps(instances: Vec<Instance>) -> Result<Vec<Instance>> {
    let items: Vec<(&Mask, ClassId)> = instances.iter().map(|i| (&i.mask, i.class_id)).collect();
    let graph = build_graph(&items, EdgeRule::Touching)?;
    let groups = graph.connected_components();

    let score_of = |i: usize| instances[i].score.unwrap_or(f64::NEG_INFINITY);
    let mut keep = vec![false; instances.len()];
    for group in &groups {
        let Some(&first) = group.first() else {
            continue;
        };
        let mut best = first;
        for &index in &group[1..] {
            if score_of(index) > score_of(best) {
                best = index;
            }
        }
        debug!(
            "Instance {} (score={:?}, class={}) selected among {} overlapping instances",
            best,
            instances[best].score,
            instances[best].class_id,
            group.len()
        );
        keep[best] = true;
    }

    // Emit survivors in group order, matching `merge`.
    let mut slots: Vec<Option<Instance>> = instances.into_iter().map(Some).collect();
    let mut selected = Vec::with_capacity(groups.len());
    for group in &groups {
        for &index in group {
            if keep[index] {
                if let Some(instance) = slots[index].take() {
                    selected.push(instance);
                }
            }
        }
    }
    Ok(selected)
}
