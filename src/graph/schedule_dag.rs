use super::arena::TaskArena;
use crate::task::TaskId;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Why one task has to be scheduled before another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// predecessor -> successor
    Follows,
    /// predecessor of an ancestor -> descendant
    Inherited,
    /// child -> parent
    Hierarchy,
}

/// Processing-order graph over the tasks of an arena.
pub struct ScheduleDag {
    pub graph: DiGraph<TaskId, EdgeKind>,
    pub id_to_index: HashMap<TaskId, NodeIndex>,
}

impl ScheduleDag {
    pub fn build(arena: &TaskArena) -> Self {
        let mut graph: DiGraph<TaskId, EdgeKind> = DiGraph::new();
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::new();

        for task_id in arena.ids() {
            let node_ix = graph.add_node(task_id);
            id_to_index.insert(task_id, node_ix);
        }

        for task in arena.iter() {
            let task_ix = id_to_index[&task.id];

            if let Some(&parent_ix) = task.parent.and_then(|parent| id_to_index.get(&parent)) {
                graph.add_edge(task_ix, parent_ix, EdgeKind::Hierarchy);
            }

            let descendants = if task.has_predecessors() {
                arena.descendants(task.id)
            } else {
                Vec::new()
            };
            for relation in &task.predecessors {
                let Some(&pred_ix) = id_to_index.get(&relation.predecessor) else {
                    continue;
                };
                graph.add_edge(pred_ix, task_ix, EdgeKind::Follows);
                for descendant in &descendants {
                    graph.add_edge(pred_ix, id_to_index[descendant], EdgeKind::Inherited);
                }
            }
        }

        Self { graph, id_to_index }
    }

    /// Task ids in processing order, or the id of a task on a cycle.
    pub fn order(&self) -> Result<Vec<TaskId>, TaskId> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|ix| self.graph[ix]).collect())
            .map_err(|cycle| self.graph[cycle.node_id()])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn orders_predecessors_children_and_inherited_constraints() {
        let mut arena = TaskArena::new();
        arena.insert_loaded(Task::new(1, "pred"));
        arena.insert_loaded(Task::new(2, "parent").follows(1, 0));
        arena.insert_loaded(Task::new(3, "child").child_of(2));

        let dag = ScheduleDag::build(&arena);
        let order = dag.order().unwrap();
        let pos = |id: i32| order.iter().position(|t| *t == TaskId(id)).unwrap();

        assert!(pos(1) < pos(3));
        assert!(pos(3) < pos(2));
    }

    #[test]
    fn child_following_its_parent_is_a_cycle() {
        let mut arena = TaskArena::new();
        arena.insert_loaded(Task::new(1, "parent"));
        arena.insert_loaded(Task::new(2, "child").child_of(1).follows(1, 0));

        let dag = ScheduleDag::build(&arena);
        assert!(dag.order().is_err());
        assert_eq!(dag.node_count(), 2);
    }
}
