//! Interrupt controller: one pending-IRQ flag per channel.
//!
//! The original implementation tracks a single global pending flag;
//! this crate generalizes to per-channel flags since peripherals must
//! be distinguishable by the channel they raise (GPIO on 2, the system
//! timer on 3, MiniUART on 4) and the CPU step loop needs to know
//! *that* an IRQ is pending, not which one — channel identity only
//! matters to peripherals clearing their own flag.

use std::cell::RefCell;
use std::rc::Rc;

pub const GPIO_IRQ_CHANNEL: usize = 2;
pub const TIMER_IRQ_CHANNEL: usize = 3;
pub const UART_IRQ_CHANNEL: usize = 4;

const CHANNEL_COUNT: usize = 8;

/// Shared handle peripherals receive transiently (as a call argument,
/// never stored) to signal an IRQ channel.
pub type InterruptHandle = Rc<RefCell<InterruptController>>;

pub fn new_handle() -> InterruptHandle {
    Rc::new(RefCell::new(InterruptController::new()))
}

#[derive(Debug, Default)]
pub struct InterruptController {
    pending: [bool; CHANNEL_COUNT],
}

impl InterruptController {
    pub fn new() -> InterruptController {
        InterruptController {
            pending: [false; CHANNEL_COUNT],
        }
    }

    pub fn signal(&mut self, channel: usize) {
        self.pending[channel] = true;
    }

    pub fn clear(&mut self, channel: usize) {
        self.pending[channel] = false;
    }

    pub fn clear_all(&mut self) {
        self.pending = [false; CHANNEL_COUNT];
    }

    pub fn is_pending(&self, channel: usize) -> bool {
        self.pending[channel]
    }

    /// True if any channel has a pending IRQ; this is what the CPU
    /// step loop checks before deciding to dispatch an IRQ exception.
    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(|&p| p)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn channels_are_independent() {
        let mut ic = InterruptController::new();
        assert!(!ic.has_pending());
        ic.signal(GPIO_IRQ_CHANNEL);
        assert!(ic.has_pending());
        assert!(ic.is_pending(GPIO_IRQ_CHANNEL));
        assert!(!ic.is_pending(TIMER_IRQ_CHANNEL));
        ic.clear(GPIO_IRQ_CHANNEL);
        assert!(!ic.has_pending());
    }
}
