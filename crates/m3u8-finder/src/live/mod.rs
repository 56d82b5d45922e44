//! Live discovery: watch what a real browser requests.

pub mod observer;

pub use observer::{LiveObserver, ObserveOptions};
