use std::sync::{Arc, Mutex};
use std::time::Duration;

use flowgraph::action::{ActionError, ActionFuture, StepAction};

/// Action that does nothing; for graphs driven by hand in tests.
#[derive(Debug, Clone)]
pub struct NoopAction {
    name: String,
}

impl NoopAction {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn arc(name: &str) -> Arc<dyn StepAction> {
        Arc::new(Self::new(name))
    }
}

impl StepAction for NoopAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> ActionFuture {
        Box::pin(async { Ok(()) })
    }
}

/// Action that:
/// - records its name in a shared log when it starts
/// - optionally sleeps for `delay`
/// - succeeds, or fails with exit status 1 if built with `failing`.
#[derive(Debug, Clone)]
pub struct ScriptedAction {
    name: String,
    delay: Duration,
    fail: bool,
    executed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedAction {
    pub fn new(name: &str, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            fail: false,
            executed,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn arc(self) -> Arc<dyn StepAction> {
        Arc::new(self)
    }
}

impl StepAction for ScriptedAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> ActionFuture {
        let this = self.clone();
        Box::pin(async move {
            {
                let mut guard = this.executed.lock().unwrap();
                guard.push(this.name.clone());
            }
            if !this.delay.is_zero() {
                tokio::time::sleep(this.delay).await;
            }
            if this.fail {
                Err(ActionError::ExitStatus { code: 1 })
            } else {
                Ok(())
            }
        })
    }
}
