pub mod collector;
pub mod controller;
pub mod loop_worker;

pub use controller::{FieldNode, NodeParts};
pub use collector::run_collector;
pub use loop_worker::{run_node, OperatorCommand};
