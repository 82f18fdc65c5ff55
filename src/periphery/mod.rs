pub mod error;
pub mod ports;
pub mod std;
pub mod testing;

pub use error::{PeripheryError, PeripheryErrorKind};
pub use ports::{EffectorPort, SensorPort};
pub use self::std::{ClockSensor, StderrEffector, SystemStatsSensor};
