mod counters;
mod resampler;
mod uptime;

pub use counters::CounterState;
pub use resampler::resample;
pub use uptime::humanize_uptime;
