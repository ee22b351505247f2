//! Rolling statistics over return streams

mod rolling;

pub use rolling::RollingStd;
