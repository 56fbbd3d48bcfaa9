pub mod messages;
pub mod prompt;
pub mod transport;

pub use messages::{decode_frames, ClientMessage, InboundFrame, PCM_MIME_TYPE};
pub use prompt::{HANDSHAKE_ACK_PREFIX, SEGMENT_DELIMITER, TUTOR_PROMPT};
pub use transport::{connect, FrameSink, FrameSource, Transport};
