pub mod audio;
pub mod channel;
pub mod session;

// Re-export commonly used types for convenience
pub use audio::{
    AudioBackend, AudioBlock, AudioPathError, CAPTURE_BLOCK_SAMPLES, CAPTURE_SAMPLE_RATE,
    CaptureEngine, InputHandle, OutputSink, PLAYBACK_SAMPLE_RATE, PlaybackScheduler, Scheduled,
    SharedLevel, SourceId, VolumeMeter,
};

pub use channel::{
    AudioCallback, BoxedDuplexChannel, ChannelError, ChannelProvider, ChannelResult,
    ClosedCallback, DuplexChannel, ErrorCallback, GeminiChannelConfig, GeminiLiveChannel,
    GeminiModel, GeminiVoice, InterruptedCallback, create_channel,
    get_supported_channel_providers,
};

pub use session::{
    ChannelFactory, ConnectionState, SessionController, SessionError, SessionSnapshot,
};
