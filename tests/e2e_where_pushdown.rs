//! Property test: WHERE-predicate pushdown must produce the same binding
//! set as matching with no predicate and then filtering naively.

use graphling::cypher::ast::{CompareOp, Expr, NodePattern, PathPattern};
use graphling::matcher::{Matcher, MatcherOptions};
use graphling::{eval, property_map, GraphStore};
use proptest::prelude::*;

fn build_graph(ages: &[i64]) -> GraphStore {
    let mut g = GraphStore::new();
    for (i, age) in ages.iter().enumerate() {
        g.add_node(format!("n{i}"), "Person", property_map([("age", *age)])).unwrap();
    }
    g
}

fn age_pattern() -> PathPattern {
    PathPattern::single_node(NodePattern {
        variable: Some("n".into()),
        labels: vec!["Person".into()],
        properties: Vec::new(),
    })
}

fn age_gt_threshold(threshold: i64) -> Expr {
    Expr::Comparison {
        op: CompareOp::Gt,
        left: Box::new(Expr::Property { object: "n".into(), property: "age".into() }),
        right: Some(Box::new(Expr::Literal(graphling::Value::Int(threshold)))),
    }
}

proptest! {
    #[test]
    fn pushdown_matches_naive_post_filter(
        ages in prop::collection::vec(-50i64..50, 0..12),
        threshold in -50i64..50,
    ) {
        let g = build_graph(&ages);
        let matcher = Matcher::with_options(&g, MatcherOptions::default());
        let pattern = age_pattern();
        let where_clause = age_gt_threshold(threshold);

        let pushed_down = matcher.execute_match_query(std::slice::from_ref(&pattern), Some(&where_clause));

        let unfiltered = matcher.execute_match_query(std::slice::from_ref(&pattern), None);
        let naive: Vec<_> = unfiltered
            .into_iter()
            .filter(|binding| eval::eval_bool(&where_clause, binding, &g, &MatcherOptions::default()))
            .collect();

        let mut pushed_ids: Vec<String> = pushed_down
            .iter()
            .map(|b| b["n"].as_node().unwrap().id.0.clone())
            .collect();
        let mut naive_ids: Vec<String> = naive
            .iter()
            .map(|b| b["n"].as_node().unwrap().id.0.clone())
            .collect();
        pushed_ids.sort();
        naive_ids.sort();

        prop_assert_eq!(pushed_ids, naive_ids);
    }
}
