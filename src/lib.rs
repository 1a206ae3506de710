pub mod invocation;
pub mod telemetry;
