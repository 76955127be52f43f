//! Display state: typed snapshot, decoder and change requests

pub mod decode;
mod request;
mod state;

pub use decode::{decode_state, RawMonitorsState};
pub use request::{ApplyLogicalMonitor, ApplyMethod, ApplyMonitor, ApplyRequest};
pub use state::{GlobalProperties, LogicalMonitor, Mode, Monitor, MonitorSpec, MonitorsState};
