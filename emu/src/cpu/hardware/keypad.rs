use serde::{Deserialize, Serialize};

/// KEYINPUT/KEYCNT: button state (active-low) and the IRQ mask/condition
/// used to wake the CPU from a key-press while halted.
#[derive(Default, Serialize, Deserialize)]
pub struct Keypad {
    pub key_input: u16,
    pub key_interrupt_control: u16,
}
