//! Hardware-independent core library for the Park It! kiosk
//!
//! This crate holds the sensor acquisition and data-sharing subsystem:
//! sensor adapters, the shared reading store and bounded queue, the session
//! accumulator, the display sink, the cloud publisher and the task bodies
//! that tie them together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod config;
pub mod display_manager;
pub mod identity;
pub mod publisher;
pub mod readings;
pub mod sampling;
pub mod sensors;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod widgets;
