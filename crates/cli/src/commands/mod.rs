pub mod export;
pub mod label;
pub mod onboard;
pub mod serve;
pub mod stats;
pub mod status;
