pub mod attempt;
pub mod evidence;
pub mod transport;
pub mod uploader;

pub use attempt::{classify, AttemptStatus, RetryPolicy, UploadAttempt};
pub use evidence::{content_type_for, EvidenceFiles, EvidencePart};
pub use transport::{
    HttpSettings, HttpTransport, Transport, TransportError, TransportResponse, MEDIA_FIELD,
    SYSTEM_ID_FIELD, VIDEO_FIELD,
};
pub use uploader::{EvidenceUploader, Sleeper, ThreadSleeper, UploadMetadata, UploadReport};
