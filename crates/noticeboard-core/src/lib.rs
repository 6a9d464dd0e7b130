pub mod codec;
pub mod notice;
pub mod record;
pub mod template;

pub use codec::{DecodeError, decode, encode};
pub use notice::{FormField, Notice, NoticeId, NoticeType, UnknownNoticeType};
pub use record::{RECORD_TYPE, RecordValue, RemoteRecord, SUBSCRIPTION_ID};
