mod arena;
mod builder;
mod reader;
pub mod schedule_dag;

pub use arena::TaskArena;
pub use builder::{AffectedGraph, GraphBuilder, NewLink};
pub use reader::{GraphReadError, TaskGraphReader};
pub use schedule_dag::{EdgeKind, ScheduleDag};
