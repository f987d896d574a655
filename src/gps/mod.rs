// src/gps/mod.rs
//! GPS data handling and parsing

pub mod accuracy;
pub mod data;
pub mod nmea;

pub use data::GpsFix;
pub use nmea::NmeaDecoder;
