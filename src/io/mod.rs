//! I/O operations module
//!
//! Raw device access, aligned buffers and the monotonic clock the
//! benchmarks are timed with.

pub mod buffer;
pub mod clock;
pub mod device;
pub mod simulated;

pub use buffer::{align_ceil, align_floor, round_up_to_power_of_two, AlignedBuffer};
pub use clock::{elapsed_ns, Clock, MonotonicClock, SteppingClock, Timestamp};
pub use device::{probe, BlockDevice, RawBlockDevice};
pub use simulated::SimulatedDevice;
