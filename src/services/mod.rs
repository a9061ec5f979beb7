pub mod attachment;
pub mod resolver;
pub mod retry;
pub mod stream;

pub use attachment::{AttachmentHeaders, DownloadKind, attachment_headers};
pub use resolver::{EpisodeResolver, ResolveError, Resolution, select_episode};
pub use retry::RetryPolicy;
pub use stream::{ProxiedStream, StreamError, StreamProxy, StreamRequest};
