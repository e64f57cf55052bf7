//! `sensor_models` — IMU sensor parameter models.

pub mod imu;

pub use imu::ImuParams;
