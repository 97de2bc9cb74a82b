//! Hardware abstraction layer.
//!
//! Capability traits the scan engine drives, a grid peak finder, and mock
//! devices for running without instruments attached.

pub mod capabilities;
pub mod local_maxima;
pub mod mock;

pub use capabilities::{Actuator, Detector, PeakFinder, RenderRequest, Renderer};
pub use local_maxima::LocalMaxima;
pub use mock::{FlakyDetector, GaussianSpot, MockCounter, MockMirror, MockRenderer, SharedBeam};
