//! Same-thread deferred work.
//!
//! Extension requests are posted here and run by the host after the current
//! layout/scroll pass. Each edge has its own in-flight flag; a request for an
//! edge that is already extending is dropped, not queued.

use std::collections::VecDeque;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    Extend(Edge),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Flight {
    #[default]
    Idle,
    Extending,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: VecDeque<DeferredTask>,
    start: Flight,
    end: Flight,
}

impl Scheduler {
    /// Marks `edge` as extending and posts the task. Returns `false` when the
    /// request was dropped.
    pub fn post_extension(&mut self, edge: Edge) -> bool {
        let flight = self.flight_mut(edge);
        if *flight == Flight::Extending {
            debug!(?edge, "extension already in flight; dropping request");
            return false;
        }
        *flight = Flight::Extending;
        self.queue.push_back(DeferredTask::Extend(edge));
        true
    }

    pub fn finish_extension(&mut self, edge: Edge) {
        *self.flight_mut(edge) = Flight::Idle;
    }

    pub fn next_task(&mut self) -> Option<DeferredTask> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drops queued work and resets both flags.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.start = Flight::Idle;
        self.end = Flight::Idle;
    }

    fn flight_mut(&mut self, edge: Edge) -> &mut Flight {
        match edge {
            Edge::Start => &mut self.start,
            Edge::End => &mut self.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_for_same_edge_is_dropped() {
        let mut scheduler = Scheduler::default();
        assert!(scheduler.post_extension(Edge::End));
        assert!(!scheduler.post_extension(Edge::End));
        assert_eq!(scheduler.pending(), 1);

        scheduler.reset();
        assert_eq!(scheduler.pending(), 0);
        assert!(scheduler.post_extension(Edge::End));
    }

    #[test]
    fn edges_are_independent() {
        let mut scheduler = Scheduler::default();
        assert!(scheduler.post_extension(Edge::End));
        assert!(scheduler.post_extension(Edge::Start));
        assert_eq!(scheduler.next_task(), Some(DeferredTask::Extend(Edge::End)));
        assert_eq!(scheduler.next_task(), Some(DeferredTask::Extend(Edge::Start)));
        assert_eq!(scheduler.next_task(), None);
    }

    #[test]
    fn finishing_reopens_the_edge() {
        let mut scheduler = Scheduler::default();
        scheduler.post_extension(Edge::Start);
        scheduler.next_task();
        assert!(!scheduler.post_extension(Edge::Start));
        scheduler.finish_extension(Edge::Start);
        assert!(scheduler.post_extension(Edge::Start));
    }
}
