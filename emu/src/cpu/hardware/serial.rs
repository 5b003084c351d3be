use serde::{Deserialize, Serialize};

/// Raw SIO/JOY-bus register backing store. This core does not implement
/// link-cable communication (no second machine to talk to), so these
/// registers are plain read/write storage with no side effects — present
/// so ROMs that merely probe for a connected peripheral and bail out
/// gracefully see a consistent disconnected-link state rather than open bus.
#[derive(Default, Serialize, Deserialize)]
pub struct Serial {
    /// SIODATA32 in normal mode; SIOMULTI0/SIOMULTI1 packed together in
    /// multiplayer mode.
    pub sio_data_32_multi_data_0_data_1: u32,
    pub sio_multi_data_2: u16,
    pub sio_multi_data_3: u16,
    pub sio_control_register: u16,
    /// SIOMLT_SEND in multiplayer mode; SIODATA8 in normal mode.
    pub sio_multi_data_send_data_8: u16,
    pub sio_mode_select: u16,
    pub infrared_register: u16,
    pub sio_joy_bus_control: u16,
    pub sio_joy_bus_receive_data: u32,
    pub sio_joy_bus_transmit_data: u32,
    pub sio_joy_bus_receive_status: u16,
}
