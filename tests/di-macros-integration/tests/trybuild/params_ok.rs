use di_abstractions::{ParamList, Params};
use std::sync::Arc;

struct Clock;

#[derive(Params)]
struct Inputs {
    clock: Arc<Clock>,
    #[dig(name = "backup", optional)]
    backup: Option<Arc<Clock>>,
    #[dig(group = "ticks")]
    ticks: Vec<Arc<u64>>,
}

fn main() {
    let mut list = ParamList::new();
    Inputs::collect(&mut list).unwrap();
    assert_eq!(list.len(), 3);
}
