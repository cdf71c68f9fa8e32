//! Host-side integration tests for accessory-core

#[cfg(test)]
mod gesture_properties;
#[cfg(test)]
mod boundary_tests;
#[cfg(test)]
mod completion_tests;

// Links the critical-section implementation used by the embassy mock driver
use critical_section as _;
