use crate::{SimTime, Simulation};

/// Simulation execution trait.
pub trait Execute {
    /// Executes the simulation until some stopping condition is reached.
    /// The condition is implementation-specific.
    fn execute(self, sim: &mut Simulation);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndCondition {
    Time(SimTime),
    NoEvents,
    Steps(u64),
    Bounded {
        max_time: Option<SimTime>,
        max_events: u64,
    },
}

/// Executor is used for simple execution of an entire simulation.
///
/// See the crate level documentation for examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    end_condition: EndCondition,
}

impl Executor {
    /// Simulation will end only once no stage has a pending event.
    #[must_use]
    pub fn unbound() -> Self {
        Self {
            end_condition: EndCondition::NoEvents,
        }
    }

    /// Processes every event due at or before `time`.
    /// It may terminate early if no events are available.
    #[must_use]
    pub fn timed(time: SimTime) -> Self {
        Self {
            end_condition: EndCondition::Time(time),
        }
    }

    /// Simulation will execute exactly this many steps, unless we run out of events.
    #[must_use]
    pub fn steps(steps: u64) -> Self {
        Self {
            end_condition: EndCondition::Steps(steps),
        }
    }

    /// Runs until the cumulative trial count reaches `max_events` or the
    /// clock reaches `max_time`, checked after every processed event.
    ///
    /// The event that carries the clock to or past `max_time` is processed.
    #[must_use]
    pub fn bounded(max_time: Option<SimTime>, max_events: u64) -> Self {
        Self {
            end_condition: EndCondition::Bounded { max_time, max_events },
        }
    }

    /// Registers a side effect that is called _after_ each simulation step.
    #[must_use]
    pub fn side_effect<F>(self, func: F) -> ExecutorWithSideEffect<F>
    where
        F: Fn(&Simulation),
    {
        ExecutorWithSideEffect {
            end_condition: self.end_condition,
            side_effect: func,
        }
    }
}

impl Execute for Executor {
    fn execute(self, sim: &mut Simulation) {
        run_with(sim, self.end_condition, |_| {});
    }
}

pub struct ExecutorWithSideEffect<F>
where
    F: Fn(&Simulation),
{
    end_condition: EndCondition,
    side_effect: F,
}

impl<F> Execute for ExecutorWithSideEffect<F>
where
    F: Fn(&Simulation),
{
    fn execute(self, sim: &mut Simulation) {
        run_with(sim, self.end_condition, self.side_effect);
    }
}

fn run_with<F>(sim: &mut Simulation, end_condition: EndCondition, side_effect: F)
where
    F: Fn(&Simulation),
{
    let step_fn = |sim: &mut Simulation| {
        let result = sim.step();
        if result {
            side_effect(sim);
        }
        result
    };
    match end_condition {
        EndCondition::Time(time) => execute_until(sim, time, step_fn),
        EndCondition::NoEvents => execute_until_empty(sim, step_fn),
        EndCondition::Steps(steps) => execute_steps(sim, steps, step_fn),
        EndCondition::Bounded { max_time, max_events } => {
            execute_bounded(sim, max_time, max_events, step_fn)
        }
    }
}

fn execute_until_empty<F>(sim: &mut Simulation, step: F)
where
    F: Fn(&mut Simulation) -> bool,
{
    while step(sim) {}
}

fn execute_until<F>(sim: &mut Simulation, time: SimTime, step: F)
where
    F: Fn(&mut Simulation) -> bool,
{
    while sim.peek_next_event().is_some_and(|(_, t)| t <= time) {
        if !step(sim) {
            break;
        }
    }
}

fn execute_steps<F>(sim: &mut Simulation, steps: u64, step: F)
where
    F: Fn(&mut Simulation) -> bool,
{
    for _ in 0..steps {
        if !step(sim) {
            break;
        }
    }
}

fn execute_bounded<F>(sim: &mut Simulation, max_time: Option<SimTime>, max_events: u64, step: F)
where
    F: Fn(&mut Simulation) -> bool,
{
    let done = |sim: &Simulation| {
        sim.trials() >= max_events || max_time.is_some_and(|limit| sim.time() >= limit)
    };
    while !done(sim) {
        if !step(sim) {
            break;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stage::{EventKind, Network, NextEvent, Stage, StageEvent};
    use crate::StageId;
    use std::time::Duration;

    /// Stage that fires every `period`, `limit` times.
    struct Ticker {
        id: StageId,
        next: SimTime,
        period: Duration,
        fired: u32,
        limit: u32,
    }

    impl Ticker {
        fn new(limit: u32) -> Self {
            Self {
                id: StageId::new("ticker"),
                next: SimTime::zero(),
                period: Duration::from_secs(2),
                fired: 0,
                limit,
            }
        }
    }

    impl Stage for Ticker {
        fn id(&self) -> &StageId {
            &self.id
        }

        fn is_valid(&self) -> bool {
            true
        }

        fn next_event_time(&self) -> NextEvent {
            if self.fired < self.limit {
                NextEvent::At(self.next)
            } else {
                NextEvent::Never
            }
        }

        fn process_event(&mut self, now: SimTime, _network: &mut Network<'_>) -> Option<StageEvent> {
            self.fired += 1;
            self.next = now + self.period;
            Some(StageEvent {
                stage: self.id.clone(),
                kind: EventKind::Arrival,
                time: now,
                customer: None,
            })
        }
    }

    fn fired(sim: &Simulation) -> u32 {
        sim.stage::<Ticker>(&StageId::new("ticker")).unwrap().fired
    }

    fn sim_with_ticker(limit: u32) -> Simulation {
        let mut sim = Simulation::default();
        sim.add_stage(Ticker::new(limit)).unwrap();
        sim
    }

    #[test]
    fn test_create_executor() {
        assert_eq!(
            Executor::unbound(),
            Executor {
                end_condition: EndCondition::NoEvents
            }
        );
        assert_eq!(
            Executor::steps(7),
            Executor {
                end_condition: EndCondition::Steps(7)
            }
        );
        assert_eq!(
            Executor::bounded(None, 10),
            Executor {
                end_condition: EndCondition::Bounded {
                    max_time: None,
                    max_events: 10
                }
            }
        );
    }

    #[test]
    fn test_steps() {
        let mut sim = sim_with_ticker(10);
        Executor::steps(4).execute(&mut sim);
        assert_eq!(fired(&sim), 4);
        assert_eq!(sim.time(), SimTime::from_secs(6));
    }

    #[test]
    fn test_steps_stops_before() {
        let mut sim = sim_with_ticker(10);
        // After 10 steps there are no events, so it will not execute all 100
        Executor::steps(100).execute(&mut sim);
        assert_eq!(fired(&sim), 10);
        assert_eq!(sim.trials(), 10);
    }

    #[test]
    fn test_timed() {
        let mut sim = sim_with_ticker(10);
        Executor::timed(SimTime::from_secs(6)).execute(&mut sim);
        // Events at 0, 2, 4, 6
        assert_eq!(fired(&sim), 4);
        assert_eq!(sim.time(), SimTime::from_secs(6));
    }

    #[test]
    fn test_bounded_processes_event_reaching_limit() {
        let mut sim = sim_with_ticker(10);
        Executor::bounded(Some(SimTime::from_secs(5)), 1000).execute(&mut sim);
        // Events at 0, 2, 4 and the one at 6 that crosses the limit
        assert_eq!(fired(&sim), 4);
        assert_eq!(sim.time(), SimTime::from_secs(6));
    }

    #[test]
    fn test_bounded_trials_are_cumulative() {
        let mut sim = sim_with_ticker(10);
        Executor::bounded(None, 3).execute(&mut sim);
        assert_eq!(sim.trials(), 3);
        Executor::bounded(None, 3).execute(&mut sim);
        assert_eq!(sim.trials(), 3);
        Executor::bounded(None, 5).execute(&mut sim);
        assert_eq!(sim.trials(), 5);
    }

    #[test]
    fn test_side_effect_sees_each_step() {
        use std::sync::{Arc, Mutex};

        let mut sim = sim_with_ticker(3);
        let times = Arc::new(Mutex::new(Vec::new()));
        let sink = times.clone();
        Executor::unbound()
            .side_effect(move |sim| sink.lock().unwrap().push(sim.time()))
            .execute(&mut sim);

        assert_eq!(
            *times.lock().unwrap(),
            vec![SimTime::zero(), SimTime::from_secs(2), SimTime::from_secs(4)]
        );
    }
}
