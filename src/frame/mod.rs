//! Sensor-side buffers: BGRA color frames, 16-bit depth frames and the color-to-depth map.

pub(crate) mod buffers;
