//! Selinger-style subset-DP join enumerator (§4.12). Given the logical
//! plan's plain joins (subplan-joins are never reordered — see DESIGN.md)
//! and per-alias post-filter cardinalities, produces the join order and
//! per-step outer/inner orientation minimizing estimated total cost.

use common::logical_plan::{JoinNode, PredicateOp};
use common::ids::ContainerId;
use crate::stats::StatsCatalog;
use std::collections::{BTreeSet, HashMap};

/// The source this spec is drawn from determines "is this field a primary
/// key" from catalog metadata that has no equivalent surface in this
/// engine's `Catalog` trait. Rather than inventing a heuristic (e.g.
/// inferring PK-ness from distinct-value counts), primary-key columns are
/// named explicitly by whoever drives the optimizer — see DESIGN.md.
#[derive(Debug, Clone, Default)]
pub struct PrimaryKeys {
    columns: BTreeSet<(String, String)>,
}

impl PrimaryKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `alias.field` as a primary key column.
    pub fn mark(&mut self, alias: &str, field: &str) -> &mut Self {
        self.columns.insert((alias.to_string(), field.to_string()));
        self
    }

    pub fn is_primary_key(&self, alias: &str, field: &str) -> bool {
        self.columns.contains(&(alias.to_string(), field.to_string()))
    }
}

/// The chosen join order: each entry is a `JoinNode` with `left_alias` as
/// the outer (build/probe-driving) side and `right_alias` as the inner
/// side, in application order.
#[derive(Debug, Clone)]
pub struct JoinPlan {
    pub order: Vec<JoinNode>,
    pub cost: f64,
    pub cardinality: f64,
}

#[derive(Debug, Clone)]
struct Entry {
    order: Vec<JoinNode>,
    cost: f64,
    cardinality: f64,
    nodes: BTreeSet<String>,
}

fn join_cost(op: PredicateOp, ca: f64, cb: f64, card_a: f64, card_b: f64) -> f64 {
    if op == PredicateOp::Equals {
        ca + card_a + cb
    } else {
        ca + card_a * cb + card_a * card_b
    }
}

fn join_cardinality(
    op: PredicateOp,
    t1_is_pk: bool,
    t2_is_pk: bool,
    card1: f64,
    card2: f64,
) -> f64 {
    if op == PredicateOp::Equals {
        if t1_is_pk && t2_is_pk {
            card1.min(card2)
        } else if t1_is_pk {
            card2
        } else if t2_is_pk {
            card1
        } else {
            card1.max(card2)
        }
    } else {
        (0.3 * card1 * card2).round().max(1.0)
    }
}

/// Scan cost and post-filter cardinality for a single alias, standing in
/// for the trivial one-table "plan" at the leaves of the DP.
fn base_plan(
    alias: &str,
    alias_to_table: &HashMap<String, ContainerId>,
    base_cardinalities: &HashMap<String, f64>,
    stats: &StatsCatalog,
) -> (f64, f64) {
    let table_id = alias_to_table[alias];
    let cost = stats
        .get(table_id)
        .map(|s| s.scan_cost(stats.io_cost_per_page()))
        .unwrap_or(0.0);
    let card = base_cardinalities.get(alias).copied().unwrap_or(1.0);
    (cost, card)
}

/// Try extending `prev` (or, if `prev` is `None`, the empty plan) by `j`.
/// Returns `None` if `j` does not connect exactly one new alias to the
/// plan (cyclic or disconnected edges are rejected, matching the
/// "disconnected joins" failure the physical plan builder raises later).
fn extend(
    prev: Option<&Entry>,
    j: &JoinNode,
    alias_to_table: &HashMap<String, ContainerId>,
    base_cardinalities: &HashMap<String, f64>,
    stats: &StatsCatalog,
    pk: &PrimaryKeys,
) -> Option<Entry> {
    let (t1_in_prev, t2_in_prev) = match prev {
        Some(p) => (p.nodes.contains(&j.left_alias), p.nodes.contains(&j.right_alias)),
        None => (false, false),
    };

    let (prev_cost, prev_card, prev_order, prev_nodes): (f64, f64, Vec<JoinNode>, BTreeSet<String>) = match prev {
        Some(p) => (p.cost, p.cardinality, p.order.clone(), p.nodes.clone()),
        None => (0.0, 1.0, Vec::new(), BTreeSet::new()),
    };

    // Which alias of `j` is already covered, and which is freshly introduced.
    let (prev_alias, fresh_alias, prev_is_left): (String, String, bool) = if prev.is_none() {
        // Base case: neither side exists yet; treat left as "prev" (a
        // single-table plan) and right as fresh, purely to reuse the same
        // extension math below.
        (j.left_alias.clone(), j.right_alias.clone(), true)
    } else if t1_in_prev && !t2_in_prev {
        (j.left_alias.clone(), j.right_alias.clone(), true)
    } else if t2_in_prev && !t1_in_prev {
        (j.right_alias.clone(), j.left_alias.clone(), false)
    } else {
        // Either both sides already covered (cycle) or neither is (disconnected).
        return None;
    };

    let (cost_prev_side, card_prev_side) = if prev.is_none() {
        base_plan(&prev_alias, alias_to_table, base_cardinalities, stats)
    } else {
        (prev_cost, prev_card)
    };
    let (cost_fresh_side, card_fresh_side) = base_plan(&fresh_alias, alias_to_table, base_cardinalities, stats);

    let t1_is_pk = pk.is_primary_key(&j.left_alias, &j.left_field);
    let t2_is_pk = pk.is_primary_key(&j.right_alias, &j.right_field);
    // card1/card2 line up with j.left_alias/j.right_alias regardless of
    // which side happens to be the already-covered one.
    let (card1, card2) = if prev_is_left {
        (card_prev_side, card_fresh_side)
    } else {
        (card_fresh_side, card_prev_side)
    };
    let new_card = join_cardinality(j.op, t1_is_pk, t2_is_pk, card1, card2);

    // Two orientations: prev-side as outer, or fresh-side as outer.
    let cost_prev_outer = join_cost(j.op, cost_prev_side, cost_fresh_side, card_prev_side, card_fresh_side);
    let cost_fresh_outer = join_cost(j.op, cost_fresh_side, cost_prev_side, card_fresh_side, card_prev_side);

    let (chosen_cost, step) = if cost_prev_outer <= cost_fresh_outer {
        // outer = prev_alias, inner = fresh_alias.
        let step = if prev_is_left { j.clone() } else { j.swap_sides() };
        (cost_prev_outer, step)
    } else {
        let step = if prev_is_left { j.swap_sides() } else { j.clone() };
        (cost_fresh_outer, step)
    };

    let mut order = prev_order;
    order.push(step);
    let mut nodes = prev_nodes;
    nodes.insert(j.left_alias.clone());
    nodes.insert(j.right_alias.clone());

    Some(Entry {
        order,
        cost: chosen_cost,
        cardinality: new_card,
        nodes,
    })
}

/// Order `joins` to minimize estimated total cost via subset-DP.
///
/// `joins` must contain only plain equi/comparison joins between aliases
/// already present in `alias_to_table` — `SubplanJoinNode`s are applied
/// outside of this ordering step.
pub fn optimize_join_order(
    joins: &[JoinNode],
    alias_to_table: &HashMap<String, ContainerId>,
    base_cardinalities: &HashMap<String, f64>,
    stats: &StatsCatalog,
    pk: &PrimaryKeys,
) -> JoinPlan {
    let n = joins.len();
    if n == 0 {
        return JoinPlan {
            order: Vec::new(),
            cost: 0.0,
            cardinality: 1.0,
        };
    }

    // best[mask] = best Entry using exactly the joins named by `mask`.
    let mut best: HashMap<u32, Entry> = HashMap::new();

    for size in 1..=n {
        for mask in subsets_of_size(n, size) {
            // Indices of joins in this subset, in a deterministic
            // (lexicographic-by-alias) order for tie-breaking.
            let mut indices: Vec<usize> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
            indices.sort_by_key(|&i| (joins[i].left_alias.clone(), joins[i].right_alias.clone()));

            let mut best_entry: Option<Entry> = None;
            for &i in &indices {
                let prev_mask = mask & !(1 << i);
                let prev_entry = if prev_mask == 0 {
                    None
                } else {
                    best.get(&prev_mask)
                };
                if prev_mask != 0 && prev_entry.is_none() {
                    // The smaller subset wasn't a valid connected plan.
                    continue;
                }
                if let Some(candidate) = extend(prev_entry, &joins[i], alias_to_table, base_cardinalities, stats, pk) {
                    let better = match &best_entry {
                        None => true,
                        Some(cur) => candidate.cost < cur.cost,
                    };
                    if better {
                        best_entry = Some(candidate);
                    }
                }
            }

            if let Some(entry) = best_entry {
                best.insert(mask, entry);
            }
        }
    }

    let full_mask = (1u32 << n) - 1;
    match best.get(&full_mask) {
        Some(entry) => {
            info!(
                "optimizer: chosen join order cost={:.1} cardinality={:.1}",
                entry.cost, entry.cardinality
            );
            JoinPlan {
                order: entry.order.clone(),
                cost: entry.cost,
                cardinality: entry.cardinality,
            }
        }
        None => {
            // Disconnected join graph: fall back to the joins' given order.
            JoinPlan {
                order: joins.to_vec(),
                cost: f64::INFINITY,
                cardinality: f64::INFINITY,
            }
        }
    }
}

fn subsets_of_size(n: usize, size: usize) -> Vec<u32> {
    let mut out = Vec::new();
    for mask in 0u32..(1 << n) {
        if mask.count_ones() as usize == size {
            out.push(mask);
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use common::logical_plan::PredicateOp;

    fn join(left: &str, right: &str, lf: &str, rf: &str) -> JoinNode {
        JoinNode {
            left_alias: left.to_string(),
            right_alias: right.to_string(),
            left_field: lf.to_string(),
            right_field: rf.to_string(),
            op: PredicateOp::Equals,
        }
    }

    fn stats_with_pages(pages: u64) -> StatsCatalog {
        // TableStats::compute needs a live storage manager; the optimizer
        // only needs `scan_cost`, so build catalogs via the public API in
        // the integration tests below and keep this test cost-agnostic
        // where page counts don't matter (joins with equal costs).
        let _ = pages;
        StatsCatalog::new(1000.0)
    }

    #[test]
    fn single_join_picks_an_order() {
        let joins = vec![join("a", "b", "id", "id")];
        let mut alias_to_table = HashMap::new();
        alias_to_table.insert("a".to_string(), 1u64);
        alias_to_table.insert("b".to_string(), 2u64);
        let mut cards = HashMap::new();
        cards.insert("a".to_string(), 10.0);
        cards.insert("b".to_string(), 1000.0);
        let stats = stats_with_pages(1);
        let pk = PrimaryKeys::new();

        let plan = optimize_join_order(&joins, &alias_to_table, &cards, &stats, &pk);
        assert_eq!(plan.order.len(), 1);
    }

    #[test]
    fn s5_pk_equality_orders_small_join_first() {
        // Three tables: a(10), b(1000), c(100). a.id is the PK that b.fid
        // references, so a<->b should join first producing a 1000-row
        // intermediate, not b<->c first (1000*0.3*100 much larger, or PK
        // rules elsewhere making that join more expensive/larger).
        let joins = vec![join("a", "b", "id", "fid"), join("b", "c", "id", "fid")];
        let mut alias_to_table = HashMap::new();
        alias_to_table.insert("a".to_string(), 1u64);
        alias_to_table.insert("b".to_string(), 2u64);
        alias_to_table.insert("c".to_string(), 3u64);
        let mut cards = HashMap::new();
        cards.insert("a".to_string(), 10.0);
        cards.insert("b".to_string(), 1000.0);
        cards.insert("c".to_string(), 100.0);
        let stats = stats_with_pages(1);
        let mut pk = PrimaryKeys::new();
        pk.mark("a", "id");
        pk.mark("c", "id");

        let plan = optimize_join_order(&joins, &alias_to_table, &cards, &stats, &pk);
        assert_eq!(plan.order.len(), 2);
        let first_nodes: BTreeSet<&str> =
            [plan.order[0].left_alias.as_str(), plan.order[0].right_alias.as_str()]
                .into_iter()
                .collect();
        assert_eq!(first_nodes, BTreeSet::from(["a", "b"]));
    }
}
