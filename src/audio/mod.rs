// Audio module - sample acquisition seam and offline sources

pub mod analyser;
pub mod fixture;
pub mod source;
pub mod synth;

// Re-export commonly used types for convenience
pub use analyser::ByteAnalyser;
pub use fixture::PcmSource;
pub use source::SampleSource;
pub use synth::SyntheticKnock;
