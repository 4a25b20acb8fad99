/// CPU budget for incremental planning.
///
/// The planner checks this between territories; a territory that cannot start
/// this tick is deferred and picked up on a later one.
pub struct CpuBudget {
    /// Function that returns true if the planner should continue working.
    should_continue: Box<dyn Fn() -> bool>,
}

impl CpuBudget {
    pub fn new<F: Fn() -> bool + 'static>(should_continue: F) -> Self {
        CpuBudget {
            should_continue: Box::new(should_continue),
        }
    }

    /// Returns true if there is budget remaining to continue work.
    pub fn has_budget(&self) -> bool {
        (self.should_continue)()
    }

    /// Unlimited budget (for offline use and tests).
    pub fn unlimited() -> Self {
        CpuBudget {
            should_continue: Box::new(|| true),
        }
    }
}
