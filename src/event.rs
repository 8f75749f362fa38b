//! Event handling.
//!
//! This library exposes an event-based interface for reacting
//! to the state changes of the emulator in real-time. [EventListeners](EventListener)
//! can be registered on the [Emulator](crate::emulator::Emulator) with the
//! [add_listener](crate::emulator::Emulator::add_listener) method.
//!
//! A blanket implementation of [EventListener] for all `Fn(&Event)` is provided.

use crate::emulator::Halt;
use crate::instruction::{Instruction, Register};

/// Represents an event that occurred while executing a program.
#[derive(Debug)]
pub enum Event<'a> {
    /// An instruction is about to be executed.
    Execute {
        /// Index of the instruction.
        pc: usize,

        /// Source line the instruction was loaded from.
        line: usize,

        instruction: &'a Instruction,
    },

    /// The program modified a word of memory.
    MemoryChange {
        /// The address of the first byte of the word.
        address: u32,

        /// New value of the word.
        data: u32,
    },

    /// The program modified a register. Writes to `$zero` do not produce this event.
    RegisterChange {
        /// The register which was modified.
        register: Register,

        /// The new value of the register.
        data: u32,
    },

    /// The program printed something to the console.
    Output {
        text: &'a str,
    },

    /// Execution stopped without an error.
    Halted {
        reason: Halt,
    },
}

/// Trait for consuming events.
pub trait EventListener {
    /// Called whenever a new event has been created.
    fn event(&mut self, event: &Event);
}

impl<F> EventListener for F where F: Fn(&Event) {
    fn event(&mut self, event: &Event) {
        self(event)
    }
}

pub(crate) struct EventDispatcher {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventDispatcher {
    pub fn new() -> EventDispatcher {
        EventDispatcher {
            listeners: Vec::new(),
        }
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener) as Box<dyn EventListener>)
    }

    pub fn dispatch(&mut self, event: Event) {
        for listener in &mut self.listeners {
            listener.event(&event);
        }
    }
}
