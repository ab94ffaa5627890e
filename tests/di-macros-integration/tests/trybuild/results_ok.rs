use di_abstractions::{ResultOptions, Results};
use std::sync::Arc;

struct Clock;

#[derive(Results)]
struct Outputs {
    #[dig(name = "primary")]
    clock: Arc<Clock>,
    #[dig(group = "ticks,flatten")]
    ticks: Vec<Arc<u64>>,
}

fn main() {
    let mut specs = Vec::new();
    Outputs::collect(&ResultOptions::default(), &mut specs).unwrap();
    assert_eq!(specs.len(), 2);
}
