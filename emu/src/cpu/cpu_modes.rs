//! CPSR mode field (bits 0-4) values, fixed by the ARM architecture.

#[derive(Debug, PartialEq, Eq)]
pub enum Mode {
    /// Default execution state with no special access rights.
    User = 0b10000,

    /// Entered on FIQ exception; has its own banked register set for
    /// fast interrupt handling.
    Fiq = 0b10001,

    /// Entered on IRQ exception.
    Irq = 0b10010,

    /// Entered on reset and on SWI; the privileged mode most OS kernels run in.
    Supervisor = 0b10011,

    /// Entered on a data or instruction prefetch abort.
    Abort = 0b10111,

    /// Entered when the decoder hits an unrecognized opcode.
    Undefined = 0b11011,

    /// Privileged mode sharing the user register bank, used for OS tasks
    /// that still need full access.
    System = 0b11111,
}

impl Mode {
    const VALUES: [Self; 7] = [
        Self::User,
        Self::Fiq,
        Self::Irq,
        Self::Supervisor,
        Self::Abort,
        Self::Undefined,
        Self::System,
    ];
}

impl From<Mode> for u32 {
    fn from(m: Mode) -> Self {
        m as Self
    }
}

impl TryFrom<u32> for Mode {
    type Error = String;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::VALUES
            .into_iter()
            .find(|m| u32::from(m.bits()) == n)
            .ok_or_else(|| format!("{n:#07b} is not a valid CPSR mode field"))
    }
}

impl Mode {
    const fn bits(&self) -> u32 {
        match self {
            Self::User => 0b10000,
            Self::Fiq => 0b10001,
            Self::Irq => 0b10010,
            Self::Supervisor => 0b10011,
            Self::Abort => 0b10111,
            Self::Undefined => 0b11011,
            Self::System => 0b11111,
        }
    }
}
