//! 条件评估器性能基准测试
//!
//! 针对 ConditionEvaluator 的各种操作进行细粒度的性能测试。

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rule_engine::{Condition, ConditionEvaluator, ConditionTree, FactPath, Operator};
use serde_json::{Value, json};
use std::hint::black_box;

fn order_data() -> Value {
    json!({
        "status": 700,
        "vehicle": "Bike",
        "products": [
            {"name": "Nutella", "count": 2, "price": "7$"},
            {"name": "Coke", "count": 5, "price": "1$"}
        ],
        "basket": {"missingItems": {"array": [1, 2, 3, 4, 5, 6, 7, 8]}}
    })
}

fn leaf(path: &str, operator: Operator, value: Value) -> Condition {
    Condition::fact(FactPath::parse(path).unwrap(), operator, value)
}

/// 单个条件评估基准
fn bench_leaf_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaf_operations");
    let data = order_data();

    let cases = [
        ("strict_equal", leaf("status", Operator::StrictEqual, json!(700))),
        ("loose_equal", leaf("status", Operator::LooseEqual, json!("700"))),
        ("greater_than", leaf("products[1].count", Operator::GreaterThan, json!(3))),
        ("contains", leaf("vehicle", Operator::Contains, json!("ik"))),
        ("starts_with", leaf("products[0].name", Operator::StartsWith, json!("Nut"))),
        ("regex_match", leaf("products[0].price", Operator::RegexMatch, json!(r"^\d+\$$"))),
    ];

    for (name, condition) in &cases {
        group.bench_function(*name, |b| {
            b.iter(|| ConditionEvaluator::evaluate_leaf(black_box(condition), black_box(Some(&data))))
        });
    }

    group.finish();
}

/// each 量词在不同数组长度下的基准
fn bench_each(c: &mut Criterion) {
    let mut group = c.benchmark_group("each");
    let nested = json!({"fact": "$", "operator": "greaterThan", "value": 0});
    let condition = leaf("items", Operator::Each, nested);

    for size in [10usize, 100, 1000] {
        let data = json!({"items": (1..=size).collect::<Vec<_>>()});
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| ConditionEvaluator::evaluate_leaf(black_box(&condition), black_box(Some(data))))
        });
    }

    group.finish();
}

/// AND/OR 树的短路求值基准
fn bench_trees(c: &mut Criterion) {
    let mut group = c.benchmark_group("condition_trees");
    let data = order_data();

    let and_tree = ConditionTree::and(vec![
        leaf("status", Operator::StrictEqual, json!(700)),
        leaf("vehicle", Operator::StrictEqual, json!("Bike")),
        leaf("products[1].count", Operator::GreaterThanOrEqual, json!(5)),
    ]);
    let or_tree = ConditionTree::or(vec![
        leaf("vehicle", Operator::StrictEqual, json!("Bike")),
        leaf("vehicle", Operator::StrictEqual, json!("Car")),
    ]);

    group.bench_function("and_all_match", |b| {
        b.iter(|| ConditionEvaluator::evaluate(black_box(&and_tree), black_box(Some(&data))))
    });
    group.bench_function("or_first_match", |b| {
        b.iter(|| ConditionEvaluator::evaluate(black_box(&or_tree), black_box(Some(&data))))
    });

    group.finish();
}

criterion_group!(benches, bench_leaf_operations, bench_each, bench_trees);
criterion_main!(benches);
