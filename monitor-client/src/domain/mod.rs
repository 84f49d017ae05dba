mod company;
mod device_scan;
mod machine;
mod reading;
mod user;

pub use company::Company;
pub use device_scan::DeviceScan;
pub use machine::Machine;
pub use reading::{positive, AlarmTag, SensorReading, NORMAL_ALARM};
pub use user::{PendingUser, User, UserUpdate, PENDING_VERIFICATION};
