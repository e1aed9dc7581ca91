//! # Time units

// Frequency based

/// Hertz
pub type Hertz = fugit::HertzU32;
pub type Hz = Hertz;

/// KiloHertz
pub type KiloHertz = fugit::KilohertzU32;
pub type KHz = KiloHertz;

/// MegaHertz
pub type MegaHertz = fugit::MegahertzU32;
pub type MHz = MegaHertz;

// Period based

/// Milliseconds
pub type Milliseconds = fugit::MillisDurationU32;

/// Microseconds
pub type Microseconds = fugit::MicrosDurationU32;

// Timer based

/// Instant of a free-running microsecond timer.
pub type Instant = fugit::TimerInstantU64<1_000_000>;

/// Duration measured by a microsecond timer.
pub type Duration = fugit::TimerDurationU64<1_000_000>;

/// Monotonic microsecond time source, for example the generic timer of the CPU.
pub trait Monotonic {
    fn now(&mut self) -> Instant;
}

impl<T: Monotonic + ?Sized> Monotonic for &mut T {
    #[inline]
    fn now(&mut self) -> Instant {
        T::now(self)
    }
}
