use proptest::prelude::*;
use sheetlink_core::{CacheConfig, QueryCache, QueryKey, ResultSet, SqlValue};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Get(i64),
    Put(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![(0i64..8).prop_map(Op::Get), (0i64..8).prop_map(Op::Put)]
}

fn key(id: i64) -> QueryKey {
    QueryKey::new("SELECT price FROM metrics WHERE entityId = ?1", vec![SqlValue::Integer(id)])
}

fn rows(id: i64) -> Arc<ResultSet> {
    Arc::new(ResultSet::new(
        vec!["price".into()],
        vec![vec![SqlValue::Integer(id)]],
    ))
}

/// Most recently used at the back.
struct Model {
    capacity: usize,
    order: VecDeque<i64>,
}

impl Model {
    fn touch(&mut self, id: i64) -> bool {
        match self.order.iter().position(|k| *k == id) {
            Some(pos) => {
                self.order.remove(pos);
                self.order.push_back(id);
                true
            }
            None => false,
        }
    }

    fn put(&mut self, id: i64) {
        if !self.touch(id) {
            if self.order.len() == self.capacity {
                self.order.pop_front();
            }
            self.order.push_back(id);
        }
    }
}

proptest! {
    #[test]
    fn test_cache_matches_lru_model(
        capacity in 1usize..5,
        ops in proptest::collection::vec(op(), 1..64),
    ) {
        let cache = QueryCache::new(CacheConfig::with_capacity(capacity));
        let mut model = Model { capacity, order: VecDeque::new() };

        for op in ops {
            match op {
                Op::Get(id) => {
                    let expected = model.touch(id);
                    let got = cache.get(&key(id));
                    prop_assert_eq!(got.is_some(), expected);
                    if let Some(result) = got {
                        prop_assert_eq!(result.rows()[0][0].clone(), SqlValue::Integer(id));
                    }
                }
                Op::Put(id) => {
                    model.put(id);
                    cache.put(key(id), rows(id));
                }
            }
            prop_assert_eq!(cache.stats().entry_count, model.order.len());
        }
    }
}
