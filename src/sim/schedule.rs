/// Cooperative timer queue, advanced once per tick.
///
/// Two clocks:
///   - `Real`  always advances (hint panels, interaction grace)
///   - `Game`  only advances while gameplay time runs (level exit delay)
///
/// A task is identified by its `Task` value; scheduling an already pending
/// task replaces the old deadline. Reloading a level cancels everything.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Clock {
    Real,
    Game,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Task {
    /// Hide the transient message panel.
    HideHint,
    /// Exit delay elapsed: load the next level or complete the game.
    FinishExit,
    /// Grace window after respawn is over.
    RestoreInteraction,
}

#[derive(Clone, Debug)]
struct Pending {
    task: Task,
    clock: Clock,
    remaining: f32,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Vec<Pending>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    pub fn after(&mut self, clock: Clock, seconds: f32, task: Task) {
        self.cancel(task);
        self.pending.push(Pending { task, clock, remaining: seconds.max(0.0) });
    }

    pub fn cancel(&mut self, task: Task) {
        self.pending.retain(|p| p.task != task);
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    #[cfg(test)]
    pub fn is_pending(&self, task: Task) -> bool {
        self.pending.iter().any(|p| p.task == task)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Advance both clocks and return due tasks in scheduling order.
    pub fn advance(&mut self, real_dt: f32, game_dt: f32) -> Vec<Task> {
        let mut due = Vec::new();
        self.pending.retain_mut(|p| {
            p.remaining -= match p.clock {
                Clock::Real => real_dt,
                Clock::Game => game_dt,
            };
            if p.remaining <= 0.0 {
                due.push(p.task);
                false
            } else {
                true
            }
        });
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_clock_freezes_real_clock_does_not() {
        let mut s = Scheduler::new();
        s.after(Clock::Real, 0.1, Task::RestoreInteraction);
        s.after(Clock::Game, 0.5, Task::FinishExit);

        assert_eq!(s.advance(0.2, 0.0), vec![Task::RestoreInteraction]);
        assert!(s.advance(5.0, 0.0).is_empty());
        assert!(s.is_pending(Task::FinishExit));
        assert_eq!(s.advance(0.0, 0.5), vec![Task::FinishExit]);
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn rescheduling_replaces_deadline() {
        let mut s = Scheduler::new();
        s.after(Clock::Real, 1.0, Task::HideHint);
        s.advance(0.8, 0.0);
        s.after(Clock::Real, 1.0, Task::HideHint);
        assert!(s.advance(0.5, 0.0).is_empty());
        assert_eq!(s.advance(0.5, 0.0), vec![Task::HideHint]);
    }

    #[test]
    fn cancel_all_drops_everything() {
        let mut s = Scheduler::new();
        s.after(Clock::Real, 0.1, Task::HideHint);
        s.after(Clock::Game, 0.1, Task::FinishExit);
        s.cancel_all();
        assert!(s.advance(10.0, 10.0).is_empty());
    }
}
