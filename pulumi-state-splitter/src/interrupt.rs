use std::{
    error::Error,
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Records Ctrl-C instead of terminating, so that a stack is never left
/// half converted and `run` always gets to split the stacks again.
#[derive(Clone, Debug)]
pub struct InterruptState {
    interrupted: Arc<AtomicBool>,
}

#[derive(Clone, Debug)]
pub struct InterruptedError {}
impl Display for InterruptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "interrupted")
    }
}
impl Error for InterruptedError {}

impl InterruptState {
    pub fn new() -> Self {
        Self {
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_interrupted(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn check_interrupted(&self) -> anyhow::Result<()> {
        if self.is_interrupted() {
            Err(InterruptedError {}.into())
        } else {
            Ok(())
        }
    }
}

pub fn set_up_process_interrupt_handler() -> anyhow::Result<InterruptState> {
    let interrupt_state = InterruptState::new();
    let handler_state = interrupt_state.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received; finishing the current stack");
        handler_state.set_interrupted();
    })?;
    Ok(interrupt_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_interrupted() {
        let state = InterruptState::new();
        state.check_interrupted().unwrap();
        state.clone().set_interrupted();
        assert!(state.is_interrupted());
        let err = state.check_interrupted().unwrap_err();
        assert!(err.downcast_ref::<InterruptedError>().is_some());
    }
}
